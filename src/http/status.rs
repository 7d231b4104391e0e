/// Redirect statuses whose `Location` the proxy has to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    MovedPermanently = 301,
    Found = 302,
}

impl HttpStatus {
    pub fn from_code(code: u16) -> Option<HttpStatus> {
        match code {
            301 => Some(HttpStatus::MovedPermanently),
            302 => Some(HttpStatus::Found),
            _ => None,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            HttpStatus::MovedPermanently => "Moved Permanently",
            HttpStatus::Found => "Found",
        }
    }

    /// `HTTP/1.1 <code> <reason>`
    pub fn status_line(self) -> String {
        format!("HTTP/1.1 {} {}", self as u16, self.reason())
    }
}

/// Extracts the status code from a status line such as `HTTP/1.1 302 Found`.
pub fn parse_status_code(general: &str) -> Option<u16> {
    general.split_whitespace().nth(1)?.parse().ok()
}
