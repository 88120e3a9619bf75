pub struct Asset {
    pub body: &'static [u8],
    pub content_type: &'static str,
}

macro_rules! asset {
    ($path:literal, $mime:literal) => {
        Asset {
            body: include_bytes!($path),
            content_type: $mime,
        }
    };
}

pub fn get(path: &str) -> Option<Asset> {
    match path {
        "index.html" => Some(asset!("static/index.html", "text/html; charset=utf-8")),
        "styles.css" => Some(asset!("static/styles.css", "text/css; charset=utf-8")),
        "app.js" => Some(asset!(
            "static/app.js",
            "application/javascript; charset=utf-8"
        )),
        _ => None,
    }
}

pub fn get_text(path: &str) -> Option<&'static str> {
    get(path).and_then(|asset| std::str::from_utf8(asset.body).ok())
}
