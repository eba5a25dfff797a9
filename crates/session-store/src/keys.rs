//! Session record key constants.

/// Keys of the flat session record, as they appear in the cookie JSON.
pub struct SessionKeys;

impl SessionKeys {
    /// Bearer token for API calls
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// JWT whose `exp` claim decides whether the session is usable
    pub const ID_TOKEN: &'static str = "id_token";

    /// Long-lived credential used to mint new tokens
    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    /// Identity provider subject
    pub const USER_CID: &'static str = "usercid";

    /// Display name
    pub const USERNAME: &'static str = "username";

    /// Email address
    pub const USER_MAIL: &'static str = "usermail";

    /// Identity provider username
    pub const COGNITO_USER: &'static str = "coguser";

    /// Role tag (`User`, `Superadmin`, ...)
    pub const USER_TYPE: &'static str = "userType";

    /// Derived from the role tag
    pub const IS_SUPER_ADMIN: &'static str = "isSuperAdmin";

    /// Primary organization domain
    pub const PRIMARY_ORG: &'static str = "primary_org";

    /// Organization context (JSON object)
    pub const ORG_ID: &'static str = "orgId";

    /// Coarse logged-in flag
    pub const APP_USER_LOGGED_IN: &'static str = "appUserLoggedin";

    /// Profile image URL
    pub const IMAGE_URL: &'static str = "imageUrl";
}
