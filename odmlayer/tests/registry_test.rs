mod common;

use common::{Comment, Draft, Post, User, blog};
use odmlayer::{id, memory::InMemoryStore, prelude::*};
use std::collections::HashSet;

#[ctor::ctor]
fn init() {
    colog::init();
}

#[tokio::test]
async fn materialized_user_inherits_prototype_flags() {
    let mut builder = Odm::builder(InMemoryStore::new());
    builder.register(User::named(""), "users").await.unwrap();
    let odm = builder.seal();

    let mut ann = User::named("Ann");
    odm.materialize(&mut ann);

    assert!(!id::is_nil(&ann.id));
    assert_eq!(odm.object_id(&ann.id.to_hex()).unwrap(), ann.id);
    assert!(ann.document.is_found());
    assert!(ann.document.is_queried());
    assert!(!ann.document.is_persisted());
    assert_eq!(ann.name, "Ann");
}

#[tokio::test]
async fn inherit_flag_can_be_switched_off() {
    let mut builder = Odm::builder(InMemoryStore::new()).inherit_prototype_flags(false);
    builder.register(User::named(""), "users").await.unwrap();
    let odm = builder.seal();

    let mut ann = User::named("Ann");
    odm.materialize(&mut ann);

    assert!(!ann.document.is_found());
    assert!(!ann.document.is_queried());
    assert_eq!(ann.document.lifecycle(), Lifecycle::New);
}

#[test]
fn identifier_conversion() {
    let id = odmlayer::id::object_id("507f1f77bcf86cd799439011").unwrap();
    assert_eq!(id.to_hex(), "507f1f77bcf86cd799439011");

    assert!(matches!(
        odmlayer::id::object_id("not-an-id"),
        Err(OdmError::InvalidIdentifierFormat(ref text)) if text == "not-an-id"
    ));
}

#[tokio::test]
async fn lookup_returns_the_registered_model() {
    let store = InMemoryStore::new();
    let mut builder = Odm::builder(store.clone());
    let model = builder.register(User::named(""), "users").await.unwrap();
    let odm = builder.seal();

    assert_eq!(odm.model("User"), Some(&model));
    assert_eq!(odm.model_of::<User>().unwrap(), &model);
    assert_eq!(odm.collection("User").map(Collection::name), Some("users"));
    assert!(odm.model("Post").is_none());
    assert!(matches!(odm.model_of::<Post>(), Err(OdmError::UnregisteredSchema(_))));
    assert_eq!(
        StoreBackend::list_collections(&store).await.unwrap(),
        vec!["users".to_string()]
    );
}

#[tokio::test]
async fn derived_names_and_fields() {
    let mut builder = Odm::builder(InMemoryStore::new());
    builder.register(Post::titled(""), "posts").await.unwrap();
    let model = builder.register(Comment::on(id::nil(), ""), "comments").await.unwrap();
    let odm = builder.seal();

    assert_eq!(Comment::schema_name(), "Remark");
    assert_eq!(Comment::ID_FIELD, "key");
    assert_eq!(model.id_field(), "key");
    assert_eq!(odm.registry().schema_names(), vec!["Post", "Remark"]);
    assert_eq!(
        model.relations(odm.registry().model_tag()),
        vec![Relation::new("postId", "Post")]
    );

    let mut comment = Comment::on(id::nil(), "first");
    odm.materialize(&mut comment);

    assert!(!id::is_nil(&comment.ident));
    assert_eq!(comment.meta.model(), Some(&model));
}

#[tokio::test]
async fn field_tags_follow_the_derive() {
    assert!(User::field_tags().is_empty());
    assert_eq!(
        Post::field_tags(),
        &[
            FieldTag::new("author", "model", "User"),
            FieldTag::new("reviewer", "model", "User"),
            FieldTag::new("reviewer", "link", "User"),
        ]
    );
}

#[tokio::test]
async fn duplicate_type_names_fail() {
    mod admin {
        use odmlayer::prelude::*;

        #[derive(Debug, Clone, Serialize, Deserialize, Schema)]
        pub struct User {
            #[serde(rename = "_id")]
            pub id: ObjectId,
            pub level: u8,
            #[serde(skip)]
            pub document: DocumentState,
        }
    }

    let mut builder = Odm::builder(InMemoryStore::new());
    let first = builder.register(User::named(""), "users").await.unwrap();

    let err = builder
        .register(
            admin::User {
                id: id::nil(),
                level: 1,
                document: DocumentState::default(),
            },
            "admins",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OdmError::DuplicateSchemaRegistration(ref name) if name == "User"));
    assert!(err.is_wiring_error());

    let odm = builder.seal();
    assert_eq!(odm.model("User"), Some(&first));
    assert_eq!(odm.collection("User").map(Collection::name), Some("users"));
}

#[tokio::test]
async fn identity_field_must_be_serialized() {
    let mut builder = Odm::builder(InMemoryStore::new());

    let draft = Draft {
        id: id::nil(),
        text: String::new(),
        document: DocumentState::default(),
    };
    let err = builder.register(draft, "drafts").await.unwrap_err();

    assert!(matches!(
        err,
        OdmError::MissingIdentityField(ref schema, ref field) if schema == "Draft" && field == "id"
    ));
    assert!(!builder.is_registered("Draft"));
}

#[tokio::test]
async fn materialize_mints_a_new_identity_each_call() {
    let (_, odm) = blog().await;
    let mut post = Post::titled("Hello");

    let mut seen = HashSet::new();
    for _ in 0..8 {
        odm.materialize(&mut post);
        assert!(!id::is_nil(&post.id));
        assert!(post.document.model().is_some());
        assert!(seen.insert(post.id));
    }
}

#[tokio::test]
async fn unregistered_schema_gets_default_state() {
    let (_, odm) = blog().await;

    let mut comment = Comment::on(id::generate(), "orphan");
    odm.materialize(&mut comment);

    assert!(!id::is_nil(&comment.ident));
    assert_eq!(comment.meta, DocumentState::default());
    assert!(comment.meta.collection().is_none());
    assert!(!comment.meta.is_found());
}

#[tokio::test]
async fn builder_from_backend_builder() {
    let mut builder = OdmBuilder::from_backend_builder(InMemoryStore::builder().collection("audit"))
        .await
        .unwrap()
        .model_tag("link");
    builder.register(User::named(""), "users").await.unwrap();
    let odm = builder.seal();

    assert_eq!(odm.registry().model_tag(), "link");
    assert_eq!(
        odm.backend().list_collections().await.unwrap(),
        vec!["audit".to_string(), "users".to_string()]
    );
    assert!(odm.backend().downcast_ref::<InMemoryStore>().is_some());
}
