/// Event types recorded in the audit log.
pub mod audit_events {
    pub const USER_REGISTERED: &str = "user_registered";
    pub const LOGIN_SUCCESS: &str = "login_success";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const LOGOUT: &str = "logout";

    pub const TRIP_CREATED: &str = "trip_created";
    pub const TRIP_UPDATED: &str = "trip_updated";
    pub const TRIP_DELETED: &str = "trip_deleted";
    pub const TRIP_IMPORTED: &str = "trip_imported";

    pub const VISA_CREATED: &str = "visa_created";
    pub const VISA_UPDATED: &str = "visa_updated";
    pub const VISA_DELETED: &str = "visa_deleted";
    pub const VISA_ENTRY_RECORDED: &str = "visa_entry_recorded";
    pub const VISA_ENTRY_DELETED: &str = "visa_entry_deleted";
}
