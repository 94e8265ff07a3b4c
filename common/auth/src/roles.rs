pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_USER: &str = "USER";
