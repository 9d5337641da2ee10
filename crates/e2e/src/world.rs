//! Per-scenario state shared by the step definitions

use std::sync::Arc;
use std::time::Duration;

use pinecrest_common::SiteConfig;

use crate::monitor::PageMonitor;
use crate::pages::{
    AboutPage, CartPage, ContactPage, GalleryPage, HomePage, InstallationsPage, ProductsPage,
};
use crate::playwright::{Page, PerformanceMetrics};

/// Values one step records for a later step of the same scenario
#[derive(Debug, Clone, Default)]
pub struct ScenarioState {
    pub performance: Option<PerformanceMetrics>,
    pub gallery_load_time: Option<Duration>,
    pub download_filename: Option<String>,
    pub network_error: Option<String>,
    /// Cart total seen before a coupon was applied or removed
    pub cart_total_before: Option<String>,
}

/// Everything a scenario's steps act on
pub struct World {
    pub page: Page,
    pub config: Arc<SiteConfig>,

    pub home: HomePage,
    pub about: AboutPage,
    pub products: ProductsPage,
    pub installations: InstallationsPage,
    pub gallery: GalleryPage,
    pub contact: ContactPage,
    pub cart: CartPage,

    pub monitor: PageMonitor,
    pub state: ScenarioState,
}

impl World {
    pub fn new(page: Page, config: Arc<SiteConfig>) -> Self {
        Self {
            home: HomePage::new(page.clone(), config.clone()),
            about: AboutPage::new(page.clone(), config.clone()),
            products: ProductsPage::new(page.clone(), config.clone()),
            installations: InstallationsPage::new(page.clone(), config.clone()),
            gallery: GalleryPage::new(page.clone(), config.clone()),
            contact: ContactPage::new(page.clone(), config.clone()),
            cart: CartPage::new(page.clone(), config.clone()),
            monitor: PageMonitor::new(),
            state: ScenarioState::default(),
            page,
            config,
        }
    }

    /// Forget earlier page events and record from here on
    pub fn start_monitoring(&mut self) {
        self.monitor.start(&self.page);
    }

    /// Pull events recorded since the last refresh
    pub fn refresh_monitor(&mut self) {
        self.monitor.refresh(&self.page);
    }
}
