use axum::Json;

use crate::dtos::views::{DashboardView, HeaderView, HomeView};
use crate::middleware::CurrentSession;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Landing page", body = HomeView),
        (status = 307, description = "Signed in; redirected to the role dashboard")
    ),
    tag = "Pages"
)]
pub async fn home(CurrentSession(session): CurrentSession) -> Json<HomeView> {
    Json(HomeView {
        header: HeaderView::new("Home", &session),
    })
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Member dashboard", body = DashboardView),
        (status = 307, description = "Not signed in; redirected to sign-in")
    ),
    tag = "Pages"
)]
pub async fn dashboard(CurrentSession(session): CurrentSession) -> Json<DashboardView> {
    Json(DashboardView::new("Dashboard", "This is the dashboard page", &session))
}

#[utoipa::path(
    get,
    path = "/super-admin/dashboard",
    responses(
        (status = 200, description = "Super admin dashboard", body = DashboardView),
        (status = 307, description = "Insufficient role or not signed in")
    ),
    tag = "Pages"
)]
pub async fn super_admin_dashboard(CurrentSession(session): CurrentSession) -> Json<DashboardView> {
    Json(DashboardView::new(
        "Super Admin Dashboard",
        "This is the super admin dashboard page",
        &session,
    ))
}

#[utoipa::path(
    get,
    path = "/org-admin/dashboard",
    responses(
        (status = 200, description = "Organisation admin dashboard", body = DashboardView),
        (status = 307, description = "Insufficient role or not signed in")
    ),
    tag = "Pages"
)]
pub async fn org_admin_dashboard(CurrentSession(session): CurrentSession) -> Json<DashboardView> {
    Json(DashboardView::new(
        "Organization Admin Dashboard",
        "This is the organization admin dashboard page",
        &session,
    ))
}

#[utoipa::path(
    get,
    path = "/sub-admin/dashboard",
    responses(
        (status = 200, description = "Sub admin dashboard", body = DashboardView),
        (status = 307, description = "Insufficient role or not signed in")
    ),
    tag = "Pages"
)]
pub async fn sub_admin_dashboard(CurrentSession(session): CurrentSession) -> Json<DashboardView> {
    Json(DashboardView::new(
        "Sub Admin Dashboard",
        "This is the sub admin dashboard page",
        &session,
    ))
}
