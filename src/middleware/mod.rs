pub mod json;
pub mod path;
pub mod permission;

pub use json::ApiJson;
pub use path::ApiPath;
pub use permission::CurrentUser;
