pub mod settings;
pub mod trainer;
pub mod two_factor;

pub use settings::AppSettings;
pub use trainer::{RoleFlags, TrainerAccount, TrainerStore};
pub use two_factor::{TwoFactorRecord, TwoFactorStore};
