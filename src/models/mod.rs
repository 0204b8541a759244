pub mod comment;
pub mod envelope;
pub mod like;
pub mod playlist;
pub mod subscription;
pub mod user;
pub mod video;

pub use comment::*;
pub use envelope::*;
pub use like::*;
pub use playlist::*;
pub use subscription::*;
pub use user::*;
pub use video::*;
