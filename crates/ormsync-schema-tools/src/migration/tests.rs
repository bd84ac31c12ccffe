//! Tests for DDL emission

use pretty_assertions::assert_eq;

use super::*;
use ormsync_core::{
    AlterOperation, ColumnDefinition, ForeignKeyAction, ForeignKeyDefinition, IndexColumn,
    IndexDefinition, SchemaStatement,
};

fn column(name: &str, data_type: &str) -> ColumnDefinition {
    let mut column = ColumnDefinition::new(name, data_type);
    column.nullable = false;
    column
}

fn index(name: &str, columns: &[&str]) -> IndexDefinition {
    IndexDefinition {
        name: name.to_string(),
        columns: columns
            .iter()
            .map(|c| IndexColumn {
                name: c.to_string(),
                prefix_length: None,
            })
            .collect(),
        unique: false,
        fulltext: false,
        primary: false,
    }
}

#[test]
fn test_create_table() {
    let emitter = MySqlEmitter::new();

    let mut id = column("id", "bigint");
    id.unsigned = true;
    id.auto_increment = true;
    let mut name = column("name", "varchar");
    name.length = Some(64);

    let mut primary = index("PRIMARY", &["id"]);
    primary.primary = true;
    let mut by_name = index("name", &["name"]);
    by_name.unique = true;

    let sql = emitter.render(&SchemaStatement::CreateTable {
        table: "app_user".to_string(),
        columns: vec![id, name],
        indexes: vec![primary, by_name],
        engine: "InnoDB".to_string(),
    });

    assert_eq!(
        sql,
        "CREATE TABLE `app_user` (\n  \
         `id` BIGINT UNSIGNED NOT NULL AUTO_INCREMENT,\n  \
         `name` VARCHAR(64) NOT NULL,\n  \
         PRIMARY KEY (`id`),\n  \
         UNIQUE KEY `name` (`name`)\n\
         ) ENGINE=InnoDB DEFAULT CHARSET=utf8"
    );
}

#[test]
fn test_alter_table_clauses_in_order() {
    let emitter = MySqlEmitter::new();

    let mut email = index("email", &["email"]);
    email.unique = true;

    let sql = emitter.render(&SchemaStatement::AlterTable {
        schema: Some("app".to_string()),
        table: "user".to_string(),
        operations: vec![
            AlterOperation::DropColumn("legacy_note".to_string()),
            AlterOperation::AddColumn(column("age", "int")),
            AlterOperation::ChangeColumn {
                from: "name".to_string(),
                column: column("name", "text"),
            },
            AlterOperation::DropPrimaryKey,
            AlterOperation::DropIndex("email".to_string()),
            AlterOperation::AddIndex(email),
        ],
    });

    assert_eq!(
        sql,
        "ALTER TABLE `app`.`user`\n  \
         DROP `legacy_note`,\n  \
         ADD `age` INT NOT NULL,\n  \
         CHANGE `name` `name` TEXT NOT NULL,\n  \
         DROP PRIMARY KEY,\n  \
         DROP INDEX `email`,\n  \
         ADD UNIQUE `email` (`email`)"
    );
}

#[test]
fn test_index_forms() {
    let emitter = MySqlEmitter::new();

    let plain = index("status", &["status"]);
    assert_eq!(emitter.index_sql(&plain, true), "KEY `status` (`status`)");
    assert_eq!(emitter.index_sql(&plain, false), "ADD INDEX `status` (`status`)");

    let mut fulltext = index("body", &["body"]);
    fulltext.fulltext = true;
    fulltext.columns[0].prefix_length = Some(emitter.text_index_prefix());
    assert_eq!(
        emitter.index_sql(&fulltext, true),
        "FULLTEXT KEY `body` (`body`(32))"
    );
    assert_eq!(
        emitter.index_sql(&fulltext, false),
        "ADD FULLTEXT `body` (`body`(32))"
    );

    let mut primary = index("pk", &["id"]);
    primary.primary = true;
    assert_eq!(emitter.index_sql(&primary, false), "ADD PRIMARY KEY (`id`)");
}

#[test]
fn test_foreign_key_clauses() {
    let emitter = MySqlEmitter::new();
    let key = ForeignKeyDefinition {
        name: "abc".to_string(),
        column: "author".to_string(),
        referenced_schema: Some("app".to_string()),
        referenced_table: "user".to_string(),
        referenced_column: "id".to_string(),
        on_update: ForeignKeyAction::Cascade,
        on_delete: ForeignKeyAction::SetNull,
    };

    assert_eq!(
        emitter.foreign_key_sql(&key),
        "ADD CONSTRAINT `abc` FOREIGN KEY (`author`) REFERENCES `app`.`user` (`id`) \
         ON UPDATE CASCADE ON DELETE SET NULL"
    );

    let sql = emitter.render(&SchemaStatement::AlterTable {
        schema: None,
        table: "post".to_string(),
        operations: vec![AlterOperation::DropForeignKey("old".to_string())],
    });
    assert_eq!(sql, "ALTER TABLE `post`\n  DROP FOREIGN KEY `old`");
}

#[test]
fn test_simple_statements() {
    let emitter = MySqlEmitter::with_config(EmitterConfig::new().with_charset("utf8mb4"));
    assert_eq!(emitter.config().charset, "utf8mb4");

    assert_eq!(
        emitter.render(&SchemaStatement::RenameTable {
            from: "app_user".to_string(),
            to: "app_member".to_string(),
        }),
        "RENAME TABLE `app_user` TO `app_member`"
    );
    assert_eq!(
        emitter.render(&SchemaStatement::DropTable {
            table: "app_user".to_string(),
        }),
        "DROP TABLE `app_user`"
    );
    assert_eq!(
        emitter.render(&SchemaStatement::ChangeEngine {
            table: "app_user".to_string(),
            engine: "MyISAM".to_string(),
        }),
        "ALTER TABLE `app_user` ENGINE = MyISAM"
    );
}

#[test]
fn test_default_literals_are_escaped() {
    let emitter = MySqlEmitter::new();
    let mut title = column("title", "varchar");
    title.length = Some(10);
    title.default = Some("it's".to_string());
    assert_eq!(
        emitter.column_sql(&title),
        "`title` VARCHAR(10) NOT NULL DEFAULT 'it\\'s'"
    );
}
