use serde::{Deserialize, Serialize};

/// Screens a view can navigate or be redirected to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    Home,
    Login,
    AdminLogin,
    Register,
    Welcome,
    Dashboard,
    UserManagement,
    LoginHistory,
    BackendLogs,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::AdminLogin => "/admin-login",
            Route::Register => "/register",
            Route::Welcome => "/welcomepage",
            Route::Dashboard => "/dashboard",
            Route::UserManagement => "/user-management",
            Route::LoginHistory => "/login-history",
            Route::BackendLogs => "/backend-logs",
        }
    }

    /// Routes that need a logged-in session.
    pub fn requires_session(&self) -> bool {
        matches!(
            self,
            Route::Welcome | Route::Dashboard | Route::UserManagement
        )
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
