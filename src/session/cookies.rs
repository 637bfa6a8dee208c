// Session cookie store - merges Set-Cookie updates, renders the Cookie header

/// Cookies issued by the backend for the lifetime of the process
///
/// Names are unique; an update replaces the previous cookie of the same name
/// and moves it to the end. No expiry tracking and no persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieStore {
    // (name, raw Set-Cookie value including attributes)
    cookies: Vec<(String, String)>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `Set-Cookie` header values into the store
    pub fn update<I, S>(&mut self, set_cookie_headers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in set_cookie_headers {
            let raw = raw.as_ref().trim();
            let Some(name) = cookie_name(raw) else {
                continue;
            };
            self.cookies.retain(|(existing, _)| existing != name);
            self.cookies.push((name.to_string(), raw.to_string()));
        }
    }

    /// `name=value` pairs joined with `; `, attributes stripped
    pub fn header(&self) -> String {
        self.cookies
            .iter()
            .map(|(_, raw)| raw.split(';').next().unwrap_or_default().trim())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, raw)| raw.split(';').next().unwrap_or_default().trim())
            .and_then(|pair| pair.split_once('=').map(|(_, value)| value))
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }
}

fn cookie_name(raw: &str) -> Option<&str> {
    let (name, _) = raw.split_once('=')?;
    let name = name.trim();
    if name.is_empty() || name.contains(';') {
        None
    } else {
        Some(name)
    }
}
