/// Constants shared by the permcache crates

// Cache keys
pub const APPLICATION_CREDENTIAL_KEY: &str = "authToken";
pub const PERMISSIONS_KEY_PREFIX: &str = "PERMISSIONS|";

// Separator used when a granted permission set is stored as one cache value
pub const PERMISSION_DELIMITER: char = '|';

// Authority routes
pub const LOGIN_PATH: &str = "public/logins";
pub const AUTHZ_CHECK_PATH: &str = "secure/authz-checks";

// Length of the hex fingerprint used to identify tokens in logs
pub const TOKEN_FINGERPRINT_LEN: usize = 12;
