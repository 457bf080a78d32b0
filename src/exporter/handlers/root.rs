use std::sync::Arc;

use axum::{extract::Extension, response::Html};

/// Static informational page served at `/`, rendered once at startup so the
/// metrics-path link follows the configured path.
#[derive(Clone)]
pub struct RootPage(Arc<str>);

impl RootPage {
    #[must_use]
    pub fn new(metrics_path: &str) -> Self {
        Self(Arc::from(format!(
            "<html>\n\
             <head><title>Orcus Exporter</title></head>\n\
             <body>\n\
             <h1>Orcus Exporter</h1>\n\
             <p><a href='{metrics_path}'>Metrics</a></p>\n\
             </body>\n\
             </html>"
        )))
    }
}

pub async fn root(Extension(page): Extension<RootPage>) -> Html<String> {
    Html(page.0.to_string())
}
