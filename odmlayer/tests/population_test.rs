mod common;

use common::{Comment, Post, User, blog, saved_user};
use odmlayer::{id, memory::InMemoryStore, prelude::*};
use std::sync::Arc;

#[ctor::ctor]
fn init() {
    colog::init();
}

#[tokio::test]
async fn second_populate_is_a_cache_hit() {
    let (store, odm) = blog().await;
    let ann = saved_user(&odm, "Ann").await;

    let mut post = Post::titled("Hello");
    odm.materialize(&mut post);
    post.author = Some(ann.id);

    let before = store.stats().reads();

    let first = odm.populate::<Post, User>(&mut post, "author").await.unwrap().unwrap();
    let after_first = store.stats().reads();

    let second = odm.populate::<Post, User>(&mut post, "author").await.unwrap().unwrap();
    let after_second = store.stats().reads();

    assert_eq!(after_first, before + 1);
    assert_eq!(after_second, after_first);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.id, ann.id);
    assert_eq!(first.name, "Ann");
    assert_eq!(post.document.populated_fields(), vec!["author"]);
    assert_eq!(post.document.lifecycle(), Lifecycle::Populated);
}

#[tokio::test]
async fn populated_document_is_hydrated() {
    let (_, odm) = blog().await;
    let ann = saved_user(&odm, "Ann").await;

    let mut post = Post::titled("Hello");
    odm.materialize(&mut post);
    post.author = Some(ann.id);

    let author = odm.populate::<Post, User>(&mut post, "author").await.unwrap().unwrap();

    assert!(author.document.is_found());
    assert!(author.document.is_persisted());
    assert_eq!(author.document.model(), odm.model("User"));
}

#[tokio::test]
async fn populate_all_fills_every_tagged_field_once() {
    let (store, odm) = blog().await;
    let ann = saved_user(&odm, "Ann").await;
    let bob = saved_user(&odm, "Bob").await;

    let mut post = Post::titled("Hello");
    odm.materialize(&mut post);
    post.author = Some(ann.id);
    post.reviewer = Some(bob.id);

    let reads = store.stats().reads();
    assert_eq!(odm.populate_all(&mut post).await.unwrap(), 2);
    assert_eq!(store.stats().reads(), reads + 2);

    assert_eq!(odm.populate_all(&mut post).await.unwrap(), 0);
    assert_eq!(store.stats().reads(), reads + 2);

    assert_eq!(post.document.populated::<User>("reviewer").unwrap().name, "Bob");
    assert_eq!(post.document.populated_fields(), vec!["author", "reviewer"]);
}

#[tokio::test]
async fn empty_and_dangling_references() {
    let (_, odm) = blog().await;

    let mut post = Post::titled("Hello");
    odm.materialize(&mut post);

    assert!(odm.populate::<Post, User>(&mut post, "author").await.unwrap().is_none());

    post.author = Some(id::generate());
    assert!(odm.populate::<Post, User>(&mut post, "author").await.unwrap().is_none());
    assert!(!post.document.is_populated("author"));
    assert_eq!(post.document.lifecycle(), Lifecycle::New);
}

#[tokio::test]
async fn misdirected_populate_calls_fail() {
    let (_, odm) = blog().await;
    let mut post = Post::titled("Hello");
    odm.materialize(&mut post);

    let err = odm.populate::<Post, User>(&mut post, "title").await.unwrap_err();
    assert!(matches!(err, OdmError::UnknownRelation(ref schema, ref field) if schema == "Post" && field == "title"));

    let err = odm.populate::<Post, Post>(&mut post, "author").await.unwrap_err();
    assert!(matches!(err, OdmError::RelationTargetMismatch(..)));

    let mut comment = Comment::on(post.id, "hi");
    let err = odm.populate::<Comment, Post>(&mut comment, "postId").await.unwrap_err();
    assert!(matches!(err, OdmError::UnregisteredSchema(ref name) if name == "Remark"));
}

mod archive {
    use odmlayer::prelude::*;

    /// Same schema name as the registered `User`, different type.
    #[derive(Debug, Clone, Serialize, Deserialize, Schema)]
    pub struct User {
        #[serde(rename = "_id")]
        pub id: ObjectId,
        pub name: String,
        #[serde(skip)]
        pub document: DocumentState,
    }
}

#[tokio::test]
async fn same_named_target_type_is_rejected() {
    let (store, odm) = blog().await;
    let ann = saved_user(&odm, "Ann").await;

    let mut post = Post::titled("Hello");
    odm.materialize(&mut post);
    post.author = Some(ann.id);

    let reads = store.stats().reads();
    for _ in 0..3 {
        let err = odm
            .populate::<Post, archive::User>(&mut post, "author")
            .await
            .unwrap_err();
        assert!(matches!(err, OdmError::RelationTargetMismatch(ref field, ref target, _) if field == "author" && target == "User"));
    }

    assert_eq!(store.stats().reads(), reads);
    assert!(!post.document.is_populated("author"));
    assert!(matches!(odm.model_of::<archive::User>(), Err(OdmError::SchemaMismatch(..))));

    let author = odm.populate::<Post, User>(&mut post, "author").await.unwrap();
    assert_eq!(author.map(|u| u.name.clone()), Some("Ann".to_string()));
}

#[derive(Debug, Clone, Serialize, Deserialize, Schema)]
#[serde(rename_all = "camelCase")]
struct Invoice {
    id: ObjectId,
    #[schema(tag(model = "User"))]
    billed_to: Option<ObjectId>,
    #[serde(skip)]
    document: DocumentState,
}

#[tokio::test]
async fn renamed_relation_fields_resolve() {
    let store = InMemoryStore::new();
    let mut builder = Odm::builder(store.clone());
    builder.register(User::named(""), "users").await.unwrap();
    let model = builder
        .register(
            Invoice {
                id: id::nil(),
                billed_to: None,
                document: DocumentState::default(),
            },
            "invoices",
        )
        .await
        .unwrap();
    let odm = builder.seal();

    assert_eq!(model.relations("model"), vec![Relation::new("billedTo", "User")]);

    let ann = saved_user(&odm, "Ann").await;
    let mut invoice = Invoice {
        id: id::nil(),
        billed_to: Some(ann.id),
        document: DocumentState::default(),
    };
    odm.materialize(&mut invoice);

    let customer = odm.populate::<Invoice, User>(&mut invoice, "billedTo").await.unwrap();
    assert_eq!(customer.map(|u| u.name.clone()), Some("Ann".to_string()));
}

#[tokio::test]
async fn relation_target_must_be_registered() {
    let mut builder = Odm::builder(InMemoryStore::new());
    builder.register(Post::titled(""), "posts").await.unwrap();
    builder.register(Comment::on(id::nil(), ""), "comments").await.unwrap();
    let odm = builder.seal();

    let mut comment = Comment::on(id::generate(), "hi");
    odm.materialize(&mut comment);
    comment.post = Some(id::generate());

    // Post is registered, the dangling id just resolves to nothing
    assert!(odm.populate::<Comment, Post>(&mut comment, "postId").await.unwrap().is_none());

    let mut post = Post::titled("Hello");
    odm.materialize(&mut post);
    post.author = Some(id::generate());

    let err = odm.populate::<Post, User>(&mut post, "author").await.unwrap_err();
    assert!(matches!(err, OdmError::UnregisteredSchema(ref name) if name == "User"));
}

#[tokio::test]
async fn custom_model_tag() {
    let store = InMemoryStore::new();
    let mut builder = Odm::builder(store.clone()).model_tag("link");
    builder.register(User::named(""), "users").await.unwrap();
    builder.register(Post::titled(""), "posts").await.unwrap();
    let odm = builder.seal();

    let bob = saved_user(&odm, "Bob").await;

    let mut post = Post::titled("Hello");
    odm.materialize(&mut post);
    post.author = Some(bob.id);
    post.reviewer = Some(bob.id);

    assert!(matches!(
        odm.populate::<Post, User>(&mut post, "author").await,
        Err(OdmError::UnknownRelation(..))
    ));

    let reviewer = odm.populate::<Post, User>(&mut post, "reviewer").await.unwrap();
    assert_eq!(reviewer.map(|u| u.name.clone()), Some("Bob".to_string()));
}

#[tokio::test]
async fn explicit_relations_take_precedence() {
    let mut builder = Odm::builder(InMemoryStore::new()).model_tag("unused");
    builder.register(User::named(""), "users").await.unwrap();
    builder
        .register(
            Post::titled(""),
            SchemaOptions::new("posts").relation("author", "User"),
        )
        .await
        .unwrap();
    let odm = builder.seal();

    let ann = saved_user(&odm, "Ann").await;

    let mut post = Post::titled("Hello");
    odm.materialize(&mut post);
    post.author = Some(ann.id);
    post.reviewer = Some(ann.id);

    assert_eq!(odm.populate_all(&mut post).await.unwrap(), 1);
    assert!(post.document.is_populated("author"));
    assert!(!post.document.is_populated("reviewer"));
}

#[tokio::test]
async fn documents_populate_independently_across_tasks() {
    let (_, odm) = blog().await;
    let ann = saved_user(&odm, "Ann").await;

    let mut handles = Vec::new();
    for n in 0..4 {
        let odm = odm.clone();
        handles.push(tokio::spawn(async move {
            let mut post = Post::titled(&format!("post {n}"));
            odm.materialize(&mut post);
            post.author = Some(ann.id);

            odm.populate::<Post, User>(&mut post, "author")
                .await
                .unwrap()
                .map(|user| user.name.clone())
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some("Ann".to_string()));
    }
}
