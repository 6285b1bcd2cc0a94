use reqwest::Url;
use reqwest::header::HeaderValue;
use serde_json::Value;

const MASK: &str = "***REDACTED***";
const DEFAULT_MAX_BODY_CHARS: usize = 4_000;

/// Lowercased names whose values never reach a debug line, whether they
/// appear as query parameters, headers or JSON keys.
const SECRET_NAMES: &[&str] = &[
    "key",
    "api_key",
    "apikey",
    "api-key",
    "x-api-key",
    "token",
    "access_token",
    "authorization",
    "proxy-authorization",
    "secret",
    "password",
];

/// Controls the `[http-debug]` lines emitted by [`super::HttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpDebugConfig {
    pub enabled: bool,
    pub redact_secrets: bool,
    pub max_body_chars: usize,
}

impl HttpDebugConfig {
    pub fn from_verbose(verbose: bool) -> Self {
        Self {
            enabled: verbose,
            redact_secrets: true,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
        }
    }

    pub fn disabled() -> Self {
        Self::from_verbose(false)
    }

    pub(crate) fn url(&self, url: &Url) -> String {
        if !self.redact_secrets || url.query().is_none() {
            return url.to_string();
        }

        let pairs = url
            .query_pairs()
            .map(|(name, value)| {
                let value = if is_secret(&name) {
                    MASK.into()
                } else {
                    value.into_owned()
                };
                (name.into_owned(), value)
            })
            .collect::<Vec<_>>();

        let mut masked = url.clone();
        masked.query_pairs_mut().clear().extend_pairs(pairs);
        masked.to_string()
    }

    pub(crate) fn header_value(&self, name: &str, value: &HeaderValue) -> String {
        if self.redact_secrets && is_secret(name) {
            return MASK.to_string();
        }
        value.to_str().map_or_else(|_| "<non-utf8>".to_string(), str::to_string)
    }

    /// JSON bodies are pretty-printed with secret keys masked; anything else
    /// is logged as received. The result is cut at `max_body_chars`.
    pub(crate) fn body(&self, raw: &str) -> String {
        let shown = match serde_json::from_str::<Value>(raw) {
            Ok(mut json) => {
                if self.redact_secrets {
                    mask_json(&mut json);
                }
                serde_json::to_string_pretty(&json).unwrap_or_else(|_| raw.to_string())
            }
            Err(_) => raw.to_string(),
        };
        truncate_chars(&shown, self.max_body_chars)
    }
}

fn mask_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                if is_secret(key) {
                    *item = Value::String(MASK.to_string());
                } else {
                    mask_json(item);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_json),
        _ => {}
    }
}

fn is_secret(name: &str) -> bool {
    SECRET_NAMES
        .iter()
        .any(|secret| secret.eq_ignore_ascii_case(name))
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        None => input.to_string(),
        Some((cut, _)) => {
            let dropped = input[cut..].chars().count();
            format!("{}... <truncated {dropped} chars>", &input[..cut])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HttpDebugConfig;
    use reqwest::Url;
    use reqwest::header::HeaderValue;

    fn plain() -> HttpDebugConfig {
        HttpDebugConfig {
            redact_secrets: false,
            ..HttpDebugConfig::from_verbose(true)
        }
    }

    #[test]
    fn verbose_flag_enables_masked_logging() {
        let cfg = HttpDebugConfig::from_verbose(true);
        assert!(cfg.enabled);
        assert!(cfg.redact_secrets);
        assert_eq!(cfg.max_body_chars, 4_000);
        assert!(!HttpDebugConfig::disabled().enabled);
    }

    #[test]
    fn url_masks_secret_query_parameters_only() {
        let url = Url::parse("https://llm.example/v1/chat/completions?api_key=sk-123&view=full")
            .expect("url");
        let masked = HttpDebugConfig::from_verbose(true).url(&url);
        assert!(!masked.contains("sk-123"));
        assert!(masked.contains("view=full"));
        assert_eq!(plain().url(&url), url.to_string());

        let bare = Url::parse("https://llm.example/v1/chat/completions").expect("url");
        assert_eq!(
            HttpDebugConfig::from_verbose(true).url(&bare),
            "https://llm.example/v1/chat/completions"
        );
    }

    #[test]
    fn header_values_are_masked_case_insensitively() {
        let cfg = HttpDebugConfig::from_verbose(true);
        let bearer = HeaderValue::from_static("Bearer sk-123");
        assert_eq!(cfg.header_value("Authorization", &bearer), "***REDACTED***");
        assert_eq!(cfg.header_value("API-Key", &bearer), "***REDACTED***");
        assert_eq!(
            cfg.header_value("content-type", &HeaderValue::from_static("application/json")),
            "application/json"
        );
        assert_eq!(plain().header_value("authorization", &bearer), "Bearer sk-123");
    }

    #[test]
    fn json_bodies_are_masked_and_pretty_printed() {
        let raw = r#"{"model":"m","messages":[{"role":"user","api_key":"123"}],"token":"t"}"#;
        insta::assert_snapshot!(HttpDebugConfig::from_verbose(true).body(raw), @r#"
        {
          "messages": [
            {
              "api_key": "***REDACTED***",
              "role": "user"
            }
          ],
          "model": "m",
          "token": "***REDACTED***"
        }
        "#);
    }

    #[test]
    fn non_json_bodies_pass_through_and_long_bodies_are_cut() {
        let cfg = HttpDebugConfig::from_verbose(true);
        assert_eq!(cfg.body("upstream timeout"), "upstream timeout");

        let short = HttpDebugConfig {
            max_body_chars: 5,
            ..cfg
        };
        assert_eq!(
            short.body("abcdefghijklmnopqrstuvwxyz"),
            "abcde... <truncated 21 chars>"
        );
        assert_eq!(short.body("short"), "short");
    }
}
