pub mod account;
pub mod avatar;
pub mod sessions;
pub mod two_factor;
