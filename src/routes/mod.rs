mod auth;
mod health_check;

pub use auth::{
    change_password, current_user, login, logout, refresh, register, update_account,
    update_avatar, update_cover_image,
};
pub use health_check::health_check;
