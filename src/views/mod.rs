//! Page controllers.
//!
//! Each controller fetches what its page needs when mounted or when its
//! parameters change; nothing is cached between controllers.

pub mod account;
pub mod detail;
pub mod home;
pub mod list;
pub mod user_center;

pub use account::{FormSnapshot, LoginView, RegisterForm, RegisterOutcome, RegisterView};
pub use detail::{Comment, DetailSnapshot, PoetryDetailView};
pub use home::{featured_poems, FeaturedPoem};
pub use list::{ListSnapshot, PoetryListView};
pub use user_center::{UserCenterSnapshot, UserCenterView};
