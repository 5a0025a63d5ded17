use std::sync::Arc;

use crate::application::blog::BlogService;
use crate::application::catalog::CatalogService;
use crate::application::contact::ContactService;
use crate::application::overview::OverviewService;
use crate::application::repos::HealthRepo;
use crate::infra::uploads::UploadStorage;

/// State for the public, internet-facing router.
#[derive(Clone)]
pub struct PublicState {
    pub catalog: Arc<CatalogService>,
    pub blog: Arc<BlogService>,
    pub contact: Arc<ContactService>,
    pub overview: Arc<OverviewService>,
    pub health: Arc<dyn HealthRepo>,
    /// Read access to stored source images.
    pub media_sources: Arc<UploadStorage>,
    /// Read access to generated derivatives.
    pub media_derivatives: Arc<UploadStorage>,
}

/// State for the operator-guarded admin router.
#[derive(Clone)]
pub struct AdminState {
    pub catalog: Arc<CatalogService>,
    pub blog: Arc<BlogService>,
    pub contact: Arc<ContactService>,
}
