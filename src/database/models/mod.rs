pub mod expediente;
pub mod profile;
pub mod user;

pub use expediente::{CreateExpediente, Estado, Expediente, UpdateExpediente};
pub use profile::{CreateProfile, Profile, UpdateProfile};
pub use user::{ChangePassword, CreateUser, UpdateOwnUser, UpdateUser, User};
