mod check_in;
mod message;
mod status;
mod user;

pub mod dtos {
    pub use crate::message::dtos::*;
    pub use crate::user::dtos::*;
}

pub use crate::check_in::api::*;
pub use crate::message::api::*;
pub use crate::status::api::*;
pub use crate::user::api::*;
