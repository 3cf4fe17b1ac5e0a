//! Domain entities - the core business objects.

mod comment;

mod post;

mod user;

pub use comment::{Comment, CommentView};
pub use post::{Post, PostView};
pub use user::User;
