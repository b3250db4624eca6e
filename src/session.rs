use cookie::{Cookie, CookieJar};
use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::debug;

/// Cookies handed out by a successful login, replayed on every later request.
#[derive(Clone, Debug, Default)]
pub struct Session {
    jar: CookieJar,
}
impl Session {
    pub fn from_headers(headers: &HeaderMap) -> Session {
        let cookies = headers.get_all(SET_COOKIE).iter().filter_map(|value| {
            let value = value.to_str().ok()?;
            match Cookie::parse(value.to_owned()) {
                Ok(cookie) => Some(cookie),
                Err(e) => {
                    debug!("Ignoring malformed Set-Cookie header: {}", e);
                    None
                }
            }
        });
        Session::from_cookies(cookies)
    }
    pub fn from_cookies<I>(cookies: I) -> Session
    where
        I: IntoIterator<Item = Cookie<'static>>,
    {
        let mut jar = CookieJar::new();
        for cookie in cookies {
            jar.add_original(cookie);
        }
        Session { jar }
    }
    pub fn is_empty(&self) -> bool {
        self.jar.iter().next().is_none()
    }
    #[cfg(test)]
    fn len(&self) -> usize {
        self.jar.iter().count()
    }
    #[cfg(test)]
    fn get(&self, name: &str) -> Option<&str> {
        self.jar.get(name).map(|cookie| cookie.value())
    }
    /// Value for a `Cookie` request header, or `None` when there is nothing to send.
    pub fn header(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let mut pairs: Vec<String> = self
            .jar
            .iter()
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect();
        pairs.sort();
        Some(pairs.join("; "))
    }
}
