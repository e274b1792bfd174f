use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Request, Response},
    middleware::Next,
};

// Pages are JSON payloads and images from /uploads; nothing is framed or scripted.
const CSP: &str = "default-src 'self'; img-src 'self' https:; object-src 'none'; base-uri 'self'; form-action 'self'; frame-ancestors 'none'";

fn set_default(res: &mut Response<Body>, name: HeaderName, value: &'static str) {
    if !res.headers().contains_key(&name) {
        res.headers_mut().insert(name, HeaderValue::from_static(value));
    }
}

/// Adds CSP, Referrer-Policy and nosniff to every response. Admin and API
/// responses also get `Cache-Control: no-store`.
pub async fn security_headers(req: Request<Body>, next: Next) -> Response<Body> {
    let path = req.uri().path();
    let private = path.starts_with("/admin") || path.starts_with("/api");

    let mut res = next.run(req).await;

    set_default(&mut res, header::CONTENT_SECURITY_POLICY, CSP);
    set_default(&mut res, header::REFERRER_POLICY, "no-referrer");
    set_default(&mut res, header::X_CONTENT_TYPE_OPTIONS, "nosniff");
    if private {
        set_default(&mut res, header::CACHE_CONTROL, "no-store");
    }

    res
}
