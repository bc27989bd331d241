pub mod appointment;
pub mod enums;
pub mod facility;
pub mod referral;
pub mod reminder;
pub mod user;
pub mod wallet;

pub use appointment::*;
pub use enums::*;
pub use facility::*;
pub use referral::*;
pub use reminder::*;
pub use user::*;
pub use wallet::*;
