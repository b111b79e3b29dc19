use reqwest::Url;

use super::session::Screen;

/// Origin used to resolve app-relative hrefs; never contacted.
const APP_ORIGIN: &str = "http://app.invalid";

/// Route
///
/// The app's client-side routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    /// `/user`: the patron catalog.
    Catalog,
    /// `/search?q=`: results for one search term.
    Search { query: String },
    AdminDashboard,
    AdminBooks,
    NotFound(String),
}

impl Route {
    /// Parses an app-relative href such as `/search?q=rust`. Anything that
    /// resolves to another origin (`//host/admin`, `https://...`) is `NotFound`.
    pub fn parse(href: &str) -> Route {
        let Ok(base) = Url::parse(APP_ORIGIN) else {
            return Route::NotFound(href.to_string());
        };
        let url = match base.join(href) {
            Ok(url) if url.origin() == base.origin() => url,
            _ => return Route::NotFound(href.to_string()),
        };

        match url.path().trim_end_matches('/') {
            "/login" => Route::Login,
            "/user" => Route::Catalog,
            "/search" => Route::Search {
                query: url
                    .query_pairs()
                    .find(|(key, _)| key == "q")
                    .map(|(_, value)| value.into_owned())
                    .unwrap_or_default(),
            },
            "/admin" => Route::AdminDashboard,
            "/admin/books" => Route::AdminBooks,
            _ => Route::NotFound(href.to_string()),
        }
    }

    pub fn href(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Catalog => "/user".to_string(),
            Route::Search { query } => {
                match Url::parse_with_params(&format!("{APP_ORIGIN}/search"), [("q", query)]) {
                    Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or_default()),
                    Err(_) => "/search".to_string(),
                }
            }
            Route::AdminDashboard => "/admin".to_string(),
            Route::AdminBooks => "/admin/books".to_string(),
            Route::NotFound(href) => href.clone(),
        }
    }

    /// Where the header search box navigates. Blank terms go nowhere.
    pub fn search_href(term: &str) -> Option<String> {
        let term = term.trim();
        (!term.is_empty()).then(|| {
            Route::Search {
                query: term.to_string(),
            }
            .href()
        })
    }

    /// The screen this route renders, if any.
    pub fn screen(&self) -> Option<Screen> {
        match self {
            Route::Login => Some(Screen::Login),
            Route::Catalog => Some(Screen::Catalog),
            Route::Search { .. } => Some(Screen::Search),
            Route::AdminDashboard => Some(Screen::AdminDashboard),
            Route::AdminBooks => Some(Screen::AdminBooks),
            Route::NotFound(_) => None,
        }
    }
}
