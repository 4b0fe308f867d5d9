use crate::error::AppError;
use axum::http::Uri;

/// Not-found error naming the full URL the client asked for
pub(crate) fn url_not_found(base_url: &str, uri: &Uri) -> AppError {
    let requested = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    AppError::UrlNotFound(format!("{}{}", base_url, requested))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_not_found_message() {
        let uri: Uri = "/admin/NOPE1?x=1".parse().unwrap();
        let err = url_not_found("http://localhost:3000", &uri);
        assert_eq!(
            err.to_string(),
            "URL 'http://localhost:3000/admin/NOPE1?x=1' doesn't exist"
        );

        let uri: Uri = "/NOPE1".parse().unwrap();
        let err = url_not_found("http://localhost:3000", &uri);
        assert_eq!(
            err.to_string(),
            "URL 'http://localhost:3000/NOPE1' doesn't exist"
        );
    }
}
