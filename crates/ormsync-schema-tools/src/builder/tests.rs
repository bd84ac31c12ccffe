//! Tests for the object builder

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::*;
use crate::memory::MemoryDatabase;
use crate::object::{
    ConfigError, DbType, FieldSpec, IndexSpec, LinkType, MemoryConfigStore, ObjectConfig,
    ObjectConfigSource,
};
use ormsync_core::{
    AlterOperation, ColumnDefinition, IndexColumn, IndexDefinition, SchemaStatement,
};

struct Fixture {
    db: Arc<MemoryDatabase>,
    configs: Arc<MemoryConfigStore>,
    log: Arc<MemoryLogSink>,
    settings: BuilderConfig,
}

impl Fixture {
    fn new() -> Self {
        Self {
            db: Arc::new(MemoryDatabase::new()),
            configs: Arc::new(MemoryConfigStore::new()),
            log: Arc::new(MemoryLogSink::new()),
            settings: BuilderConfig::default(),
        }
    }

    fn with_settings(mut self, settings: BuilderConfig) -> Self {
        self.settings = settings;
        self
    }

    fn with_config(self, config: ObjectConfig) -> Self {
        self.configs.insert(config);
        self
    }

    fn context(&self) -> BuildContext {
        let locator = StaticLocator::new(self.db.clone()).with_prefix("app_");
        BuildContext::new(self.configs.clone(), Arc::new(locator))
            .with_settings(self.settings.clone())
            .with_log_sink(self.log.clone())
    }

    fn builder(&self, object: &str) -> Builder {
        Builder::new(object, self.context()).unwrap()
    }
}

/// `{id: int primary, name: varchar(64) not null, active: boolean}`
fn account() -> ObjectConfig {
    ObjectConfig::new("account")
        .with_field(FieldSpec::new("id", DbType::Int))
        .with_field(FieldSpec::new("name", DbType::Varchar).with_length(64))
        .with_field(FieldSpec::new("active", DbType::Boolean))
        .with_index(IndexSpec::primary("PRIMARY", "id"))
}

fn not_null(name: &str, data_type: &str) -> ColumnDefinition {
    let mut column = ColumnDefinition::new(name, data_type);
    column.nullable = false;
    column
}

fn plain_index(name: &str, column: &str, primary: bool) -> IndexDefinition {
    IndexDefinition {
        name: name.to_string(),
        columns: vec![IndexColumn {
            name: column.to_string(),
            prefix_length: None,
        }],
        unique: primary,
        fulltext: false,
        primary,
    }
}

/// Outdated account table: short name, extra column, non-unique email index
fn seed_stale_account(db: &MemoryDatabase) {
    let mut id = not_null("id", "int");
    id.auto_increment = true;
    let mut name = not_null("name", "varchar");
    name.length = Some(32);
    let mut email = not_null("email", "varchar");
    email.length = Some(255);

    db.apply(&SchemaStatement::CreateTable {
        table: "account".to_string(),
        columns: vec![id, name, email, ColumnDefinition::new("legacy_note", "text")],
        indexes: vec![
            plain_index("PRIMARY", "id", true),
            plain_index("email", "email", false),
        ],
        engine: "MyISAM".to_string(),
    })
    .unwrap();
}

fn tag() -> ObjectConfig {
    ObjectConfig::new("tag")
        .with_field(FieldSpec::new("id", DbType::Bigint).unsigned())
        .with_field(FieldSpec::new("title", DbType::Varchar))
        .with_index(IndexSpec::primary("PRIMARY", "id"))
}

fn article() -> ObjectConfig {
    ObjectConfig::new("article")
        .with_field(FieldSpec::new("id", DbType::Bigint).unsigned())
        .with_field(FieldSpec::new("title", DbType::Varchar))
        .with_field(FieldSpec::link("tags", LinkType::Multi, "tag").many_to_many(None))
        .with_index(IndexSpec::primary("PRIMARY", "id"))
}

fn user() -> ObjectConfig {
    ObjectConfig::new("user")
        .with_field(FieldSpec::new("id", DbType::Bigint).unsigned())
        .with_field(FieldSpec::new("login", DbType::Varchar).with_length(64))
        .with_index(IndexSpec::primary("PRIMARY", "id"))
}

fn post() -> ObjectConfig {
    ObjectConfig::new("post")
        .with_field(FieldSpec::new("id", DbType::Bigint).unsigned())
        .with_field(FieldSpec::new("body", DbType::Text))
        .with_field(FieldSpec::link("author", LinkType::Object, "user"))
        .with_index(IndexSpec::primary("PRIMARY", "id"))
}

mod build_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_create_then_validate() {
        let fixture = Fixture::new().with_config(account());
        let mut builder = fixture.builder("account");

        assert!(!builder.validate().await);
        assert!(builder.build(true).await.unwrap(), "{:?}", builder.errors());

        let executed = fixture.db.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(
            executed[0],
            "CREATE TABLE `account` (\n  \
             `id` INT NOT NULL AUTO_INCREMENT,\n  \
             `name` VARCHAR(64) NOT NULL,\n  \
             `active` TINYINT(1) UNSIGNED NOT NULL,\n  \
             PRIMARY KEY (`id`)\n\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8"
        );

        let table = fixture.db.table("account").unwrap();
        assert_eq!(table.columns[2].data_type, "tinyint");
        assert!(builder.validate().await);
    }

    #[tokio::test]
    async fn test_second_build_issues_nothing() {
        let fixture = Fixture::new().with_config(account());
        let mut builder = fixture.builder("account");
        assert!(builder.build(true).await.unwrap());

        fixture.db.clear_executed();
        assert!(builder.build(true).await.unwrap());
        assert!(fixture.db.executed().is_empty());
        assert!(builder.diff().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alter_converges_stale_table() {
        let object = account()
            .with_field(FieldSpec::new("email", DbType::Varchar))
            .with_index(IndexSpec::new("email", &["email"]).unique());
        let fixture = Fixture::new().with_config(object);
        seed_stale_account(&fixture.db);

        let mut builder = fixture.builder("account");
        assert!(!builder.validate().await);
        assert!(builder.build(true).await.unwrap(), "{:?}", builder.errors());

        assert_eq!(
            fixture.db.executed(),
            vec![
                "ALTER TABLE `account` ENGINE = InnoDB".to_string(),
                "ALTER TABLE `app`.`account`\n  \
                 DROP `legacy_note`,\n  \
                 ADD `active` TINYINT(1) UNSIGNED NOT NULL,\n  \
                 CHANGE `name` `name` VARCHAR(64) NOT NULL,\n  \
                 DROP INDEX `email`,\n  \
                 ADD UNIQUE `email` (`email`)"
                    .to_string(),
            ]
        );
        assert!(builder.validate().await);

        fixture.db.clear_executed();
        assert!(builder.build(true).await.unwrap());
        assert!(fixture.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_undeclared_column_and_its_index_are_dropped_together() {
        let fixture = Fixture::new().with_config(account());
        let mut builder = fixture.builder("account");
        assert!(builder.build(true).await.unwrap());

        let mut legacy = ColumnDefinition::new("legacy", "varchar");
        legacy.length = Some(32);
        fixture
            .db
            .apply(&SchemaStatement::AlterTable {
                schema: None,
                table: "account".to_string(),
                operations: vec![
                    AlterOperation::AddColumn(legacy),
                    AlterOperation::AddIndex(plain_index("legacy_idx", "legacy", false)),
                ],
            })
            .unwrap();
        assert!(!builder.validate().await);

        fixture.db.clear_executed();
        assert!(builder.build(true).await.unwrap(), "{:?}", builder.errors());
        assert_eq!(
            fixture.db.executed(),
            vec![
                "ALTER TABLE `app`.`account`\n  \
                 DROP `legacy`,\n  \
                 DROP INDEX `legacy_idx`"
                    .to_string(),
            ]
        );
        assert!(builder.validate().await);

        fixture.db.clear_executed();
        assert!(builder.build(true).await.unwrap());
        assert!(fixture.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_float_fields_without_digits_converge() {
        let object = account()
            .with_field(FieldSpec::new("ratio", DbType::Float))
            .with_field(FieldSpec::new("total", DbType::Decimal));
        let fixture = Fixture::new().with_config(object);
        let mut builder = fixture.builder("account");
        assert!(builder.build(true).await.unwrap(), "{:?}", builder.errors());
        assert!(builder.validate().await);

        fixture.db.clear_executed();
        assert!(builder.build(true).await.unwrap());
        assert!(fixture.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_locked_object_is_rejected_without_sql() {
        let fixture = Fixture::new().with_config(account().locked());
        let mut builder = fixture.builder("account");

        assert!(!builder.build(true).await.unwrap());
        assert_eq!(
            builder.errors(),
            &["Can not build locked object account".to_string()]
        );
        assert!(fixture.db.executed().is_empty());

        assert!(!builder.remove().await.unwrap());
        assert_eq!(
            builder.errors().last().map(String::as_str),
            Some("Can not remove locked object table account")
        );
        assert!(!builder.rename_table("member").await.unwrap());
        assert!(fixture.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_readonly_object_is_rejected() {
        let mut object = account();
        object.readonly = true;
        let fixture = Fixture::new().with_config(object);
        let mut builder = fixture.builder("account");

        assert!(!builder.build(true).await.unwrap());
        assert_eq!(builder.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_statement_records_message_and_sql() {
        let fixture = Fixture::new().with_config(account());
        fixture.db.fail_on("CREATE TABLE");
        let mut builder = fixture.builder("account");

        assert!(!builder.build(true).await.unwrap());
        assert_eq!(builder.errors().len(), 1);
        let error = &builder.errors()[0];
        assert!(error.starts_with("statement rejected"), "{}", error);
        assert!(error.contains(" SQL: CREATE TABLE `account`"), "{}", error);
    }

    #[tokio::test]
    async fn test_errors_are_cleared_between_builds() {
        let fixture = Fixture::new().with_config(account());
        fixture.db.fail_on("ENGINE = ");
        let mut builder = fixture.builder("account");
        assert!(builder.build(true).await.unwrap());

        let mut object = account();
        object.engine = "MyISAM".to_string();
        fixture.configs.insert(object);
        let mut builder = fixture.builder("account");

        // the engine change fails but the remaining steps still run
        assert!(!builder.build(true).await.unwrap());
        assert_eq!(builder.errors().len(), 1);

        fixture.configs.insert(account());
        let mut builder = fixture.builder("account");
        assert!(builder.build(true).await.unwrap());
        assert!(builder.errors().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_metadata_falls_back_to_create() {
        let fixture = Fixture::new().with_config(account());
        let mut builder = fixture.builder("account");
        assert!(builder.build(true).await.unwrap());

        fixture.db.break_introspection();
        assert!(!builder.table_exists().await);
        assert!(!builder.build(true).await.unwrap());
        assert!(builder.errors()[0].contains("already exists"));
        assert!(builder.errors()[0].contains(" SQL: CREATE TABLE"));
    }

    #[tokio::test]
    async fn test_object_without_columns_is_not_created() {
        let object = ObjectConfig::new("empty")
            .with_field(FieldSpec::new("score", DbType::Int).virtual_field());
        let fixture = Fixture::new().with_config(object);
        let mut builder = fixture.builder("empty");

        assert!(!builder.build(true).await.unwrap());
        assert_eq!(
            builder.errors(),
            &["Object empty has no stored fields".to_string()]
        );
        assert!(fixture.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_object_is_fatal() {
        let fixture = Fixture::new();
        let Err(error) = Builder::new("missing", fixture.context()) else {
            panic!("expected a config error");
        };
        assert!(matches!(
            error,
            BuilderError::Config(ConfigError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_connection_is_fatal() {
        let fixture = Fixture::new().with_config(account().with_connection("reporting"));
        let Err(error) = Builder::new("account", fixture.context()) else {
            panic!("expected a connection error");
        };
        assert!(matches!(error, BuilderError::UnknownConnection(name) if name == "reporting"));
    }
}

mod foreign_key_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keyed() -> Fixture {
        Fixture::new()
            .with_settings(BuilderConfig::new().with_foreign_keys(true))
            .with_config(user())
            .with_config(post())
    }

    #[tokio::test]
    async fn test_keys_created_after_table() {
        let fixture = keyed();
        assert!(fixture.builder("user").build(true).await.unwrap());

        let mut builder = fixture.builder("post");
        assert!(builder.build(true).await.unwrap(), "{:?}", builder.errors());

        let keys = builder.foreign_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].source_field, "author");
        assert_eq!(keys[0].target_table, "user");
        assert_eq!(keys[0].name.len(), 32);

        let executed = fixture.db.executed();
        assert!(executed[1].starts_with("CREATE TABLE `post`"));
        assert!(executed[2].contains("ADD CONSTRAINT"));
        assert!(executed[2].contains("ON UPDATE CASCADE ON DELETE RESTRICT"));

        let table = fixture.db.table("post").unwrap();
        assert_eq!(table.foreign_keys.len(), 1);
        assert!(builder.validate().await);

        fixture.db.clear_executed();
        assert!(builder.build(true).await.unwrap());
        assert!(fixture.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_build_without_keys_skips_them() {
        let fixture = keyed();
        assert!(fixture.builder("user").build(true).await.unwrap());

        let mut builder = fixture.builder("post");
        assert!(builder.build(false).await.unwrap());
        assert!(fixture.db.table("post").unwrap().foreign_keys.is_empty());
        assert!(!builder.validate().await);
    }

    #[tokio::test]
    async fn test_disabling_keys_drops_them() {
        let fixture = keyed();
        assert!(fixture.builder("user").build(true).await.unwrap());
        assert!(fixture.builder("post").build(true).await.unwrap());
        fixture.db.clear_executed();

        let fixture = Fixture {
            settings: BuilderConfig::new().with_foreign_keys(false),
            ..fixture
        };
        let mut builder = fixture.builder("post");
        assert!(builder.build(true).await.unwrap(), "{:?}", builder.errors());

        let executed = fixture.db.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].contains("DROP FOREIGN KEY"));
        assert!(executed[1].contains("DROP INDEX"));
        assert!(executed.iter().all(|sql| !sql.contains("ADD CONSTRAINT")));
        assert!(fixture.db.table("post").unwrap().foreign_keys.is_empty());

        assert!(builder.validate().await);
        fixture.db.clear_executed();
        assert!(builder.build(true).await.unwrap());
        assert!(fixture.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_keys_skipped_for_non_transactional_engine() {
        let fixture = Fixture::new()
            .with_settings(BuilderConfig::new().with_foreign_keys(true))
            .with_config(user())
            .with_config(post().with_engine("MyISAM"));
        assert!(fixture.builder("user").build(true).await.unwrap());

        let builder = fixture.builder("post");
        assert!(builder.foreign_keys().is_empty());
    }
}

mod relation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn related() -> Fixture {
        Fixture::new()
            .with_settings(BuilderConfig::new().with_foreign_keys(true))
            .with_config(tag())
            .with_config(article())
    }

    #[tokio::test]
    async fn test_plan_lists_missing_junction() {
        let fixture = related();
        let builder = fixture.builder("article");

        let planned = builder.plan_relations();
        assert_eq!(planned.len(), 1);
        let junction = &planned[0];
        assert_eq!(junction.name, "article_tags_to_tag");
        assert_eq!(junction.parent_object.as_deref(), Some("article"));
        assert_eq!(
            junction.title.as_deref(),
            Some("Relationship many-to-many article & tag")
        );
        assert!(junction.use_db_prefix);
        assert!(junction.system);
        assert!(!junction.rev_control);
        assert_eq!(
            junction.field("source_id").and_then(|f| f.linked_object()),
            Some("article")
        );
        assert_eq!(
            junction.field("target_id").and_then(|f| f.linked_object()),
            Some("tag")
        );
        assert!(!fixture.configs.exists("article_tags_to_tag"));
    }

    #[tokio::test]
    async fn test_build_materializes_junction() {
        let fixture = related();
        assert!(fixture.builder("tag").build(true).await.unwrap());

        let mut builder = fixture.builder("article");
        assert!(builder.build(true).await.unwrap(), "{:?}", builder.errors());

        assert!(fixture.configs.exists("article_tags_to_tag"));
        let saved = fixture.configs.load("article_tags_to_tag").unwrap();
        assert_eq!(saved.table, "article_tags_to_tag");

        let junction = fixture.db.table("app_article_tags_to_tag").unwrap();
        let columns: Vec<&str> = junction.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["id", "source_id", "target_id"]);
        assert_eq!(junction.foreign_keys.len(), 2);

        assert!(builder.relations_to_create().is_empty());
        assert!(builder.validate().await);

        let mut nested = fixture.builder("article_tags_to_tag");
        assert!(nested.validate().await);

        fixture.db.clear_executed();
        assert!(builder.build(true).await.unwrap());
        assert!(fixture.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_existing_junction_table_is_a_collision() {
        let fixture = related();
        fixture
            .db
            .apply(&SchemaStatement::CreateTable {
                table: "app_article_tags_to_tag".to_string(),
                columns: vec![not_null("id", "bigint")],
                indexes: Vec::new(),
                engine: "InnoDB".to_string(),
            })
            .unwrap();

        let mut builder = fixture.builder("article");
        assert!(!builder.build(false).await.unwrap());
        assert_eq!(
            builder.errors(),
            &["Invalid value. Table name app_article_tags_to_tag should be unique".to_string()]
        );
        assert!(!fixture.configs.exists("article_tags_to_tag"));
    }

    #[tokio::test]
    async fn test_failed_junction_is_finished_by_next_build() {
        let fixture = related();
        let mut builder = fixture.builder("article");

        // the junction's key to tag cannot be created before tag exists
        assert!(!builder.build(true).await.unwrap());
        assert!(
            builder.errors()[0].contains("Failed to open the referenced table 'tag'"),
            "{:?}",
            builder.errors()
        );
        assert!(fixture.configs.exists("article_tags_to_tag"));
        assert!(!builder.validate().await);

        assert!(fixture.builder("tag").build(true).await.unwrap());
        assert!(builder.build(true).await.unwrap(), "{:?}", builder.errors());

        let junction = fixture.db.table("app_article_tags_to_tag").unwrap();
        assert_eq!(junction.foreign_keys.len(), 2);
        assert!(fixture.builder("article_tags_to_tag").validate().await);
        assert!(builder.validate().await);

        fixture.db.clear_executed();
        assert!(builder.build(true).await.unwrap());
        assert!(fixture.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_object_with_junction_name_is_a_collision() {
        let stranger = ObjectConfig::new("article_tags_to_tag")
            .with_field(FieldSpec::new("id", DbType::Bigint).unsigned())
            .with_index(IndexSpec::primary("PRIMARY", "id"));
        let fixture = related().with_config(stranger);
        assert!(fixture.builder("tag").build(true).await.unwrap());

        let mut builder = fixture.builder("article");
        assert!(!builder.build(true).await.unwrap());
        assert_eq!(
            builder.errors(),
            &["Invalid value. Object name article_tags_to_tag should be unique".to_string()]
        );
        assert!(fixture.db.table("app_article_tags_to_tag").is_none());
        assert!(!builder.validate().await);
    }

    #[tokio::test]
    async fn test_relation_depth_is_limited() {
        let fixture =
            related().with_settings(BuilderConfig::new().with_relation_depth_limit(0));
        let mut builder = fixture.builder("article");

        let error = builder.build(false).await.unwrap_err();
        assert!(matches!(
            error,
            BuilderError::RelationDepthExceeded { limit: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_broken_links() {
        let object = ObjectConfig::new("review")
            .with_field(FieldSpec::new("id", DbType::Bigint).unsigned())
            .with_field(FieldSpec::link("author", LinkType::Object, "user"))
            .with_field(FieldSpec::link("kind", LinkType::Dictionary, "review_kind"));
        let fixture = Fixture::new().with_config(object);
        let builder = fixture.builder("review");

        let broken = builder.has_broken_links().unwrap();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken.get("author").map(String::as_str), Some("user"));

        fixture.configs.insert(user());
        assert!(builder.has_broken_links().is_none());
    }
}

mod maintenance_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_rename_table() {
        let fixture = Fixture::new().with_config(account());
        let mut builder = fixture.builder("account");
        assert!(builder.build(true).await.unwrap());

        assert!(builder.rename_table("member").await.unwrap());
        assert_eq!(builder.table(), "member");
        assert_eq!(builder.config().table, "member");
        assert_eq!(fixture.db.table_names(), vec!["member".to_string()]);
        assert!(builder.table_exists().await);
    }

    #[tokio::test]
    async fn test_rename_table_applies_prefix() {
        let mut object = account();
        object.use_db_prefix = true;
        let fixture = Fixture::new().with_config(object);
        let mut builder = fixture.builder("account");
        assert!(builder.build(true).await.unwrap());
        assert_eq!(builder.table(), "app_account");

        assert!(builder.rename_table("member").await.unwrap());
        assert!(builder.table_exists_named("member", true).await);
        assert_eq!(
            fixture.db.executed().last().map(String::as_str),
            Some("RENAME TABLE `app_account` TO `app_member`")
        );
    }

    #[tokio::test]
    async fn test_rename_field_uses_new_definition() {
        let fixture = Fixture::new().with_config(account());
        assert!(fixture.builder("account").build(true).await.unwrap());

        let renamed = ObjectConfig::new("account")
            .with_field(FieldSpec::new("id", DbType::Int))
            .with_field(FieldSpec::new("title", DbType::Varchar).with_length(128))
            .with_field(FieldSpec::new("active", DbType::Boolean))
            .with_index(IndexSpec::primary("PRIMARY", "id"));
        fixture.configs.insert(renamed);

        let mut builder = fixture.builder("account");
        assert!(builder.rename_field("name", "title").await.unwrap());
        assert_eq!(
            fixture.db.executed().last().map(String::as_str),
            Some("ALTER TABLE `app`.`account`\n  CHANGE `name` `title` VARCHAR(128) NOT NULL")
        );
        assert!(builder.validate().await);

        assert!(!builder.rename_field("title", "missing").await.unwrap());
        assert_eq!(
            builder.errors(),
            &["Undefined field missing in object account".to_string()]
        );
    }

    #[tokio::test]
    async fn test_remove() {
        let fixture = Fixture::new().with_config(account());
        let mut builder = fixture.builder("account");

        assert!(builder.remove().await.unwrap());
        assert!(fixture.db.executed().is_empty());

        assert!(builder.build(true).await.unwrap());
        assert!(builder.remove().await.unwrap());
        assert_eq!(
            fixture.db.executed().last().map(String::as_str),
            Some("DROP TABLE `account`")
        );
        assert!(!builder.table_exists().await);
    }
}

mod log_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_statements_are_logged() {
        let settings = BuilderConfig::new().with_sql_log(
            SqlLogConfig::enabled("/var/log/ormsync").with_prefix("2.0"),
        );
        let fixture = Fixture::new().with_settings(settings).with_config(account());
        let mut builder = fixture.builder("account");
        assert!(builder.build(true).await.unwrap());

        let path = Path::new("/var/log/ormsync").join("default_2.0");
        let contents = fixture.log.contents(&path);
        assert!(contents.starts_with("\n--\n--"));
        assert!(contents.ends_with(&fixture.db.executed()[0]));
        assert_eq!(fixture.log.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_logging_disabled_by_default() {
        let fixture = Fixture::new().with_config(account());
        assert!(fixture.builder("account").build(true).await.unwrap());
        assert!(fixture.log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new()
            .with_settings(BuilderConfig::new().with_sql_log(SqlLogConfig::enabled(dir.path())))
            .with_config(account());
        let ctx = fixture.context().with_log_sink(Arc::new(FileLogSink));

        let mut builder = Builder::new("account", ctx).unwrap();
        assert!(builder.build(true).await.unwrap());
        assert!(builder.remove().await.unwrap());

        let written = std::fs::read_to_string(dir.path().join("default_0.1")).unwrap();
        assert!(written.contains("CREATE TABLE `account`"));
        assert!(written.ends_with("DROP TABLE `account`"));
        assert_eq!(written.matches("\n--\n--").count(), 2);
    }

    #[tokio::test]
    async fn test_unwritable_log_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing: PathBuf = dir.path().join("absent");
        let fixture = Fixture::new()
            .with_settings(BuilderConfig::new().with_sql_log(SqlLogConfig::enabled(&missing)))
            .with_config(account());
        let ctx = fixture.context().with_log_sink(Arc::new(FileLogSink));

        let mut builder = Builder::new("account", ctx).unwrap();
        assert!(!builder.build(true).await.unwrap());
        assert_eq!(
            builder.errors(),
            &[format!(
                "Cant write to log file {}",
                missing.join("default_0.1").display()
            )]
        );
        assert!(builder.table_exists().await);
    }
}

mod config_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_settings_from_toml() {
        let settings = BuilderConfig::from_toml_str(
            r#"
            foreign_keys = true
            relation_depth_limit = 2

            [sql_log]
            enabled = true
            logs_dir = "/srv/logs"
            "#,
        )
        .unwrap();

        assert!(settings.foreign_keys);
        assert_eq!(settings.relation_depth_limit, 2);
        assert!(settings.sql_log.enabled);
        assert_eq!(settings.sql_log.prefix, "0.1");
        assert_eq!(
            settings.sql_log.log_path("default"),
            PathBuf::from("/srv/logs/default_0.1")
        );
        assert!(settings.compare_config().foreign_keys);
    }

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = BuilderConfig::load(&dir.path().join("ormsync.toml")).unwrap();
        assert_eq!(settings, BuilderConfig::default());
        assert!(!settings.foreign_keys);
        assert!(!settings.sql_log.enabled);
    }

    #[test]
    fn test_invalid_settings() {
        let error = BuilderConfig::from_toml_str("foreign_keys = \"yes\"").unwrap_err();
        assert!(matches!(error, BuilderError::Settings(_)));
    }
}
