//! Telegram Mini App init data: parsing and the canonical data-check string.

use url::form_urlencoded;

/// Name of the field carrying the signature.
pub const HASH_FIELD: &str = "hash";

/// Parsed init data: every field in wire order, `hash` included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitData {
    fields: Vec<(String, String)>,
}

impl InitData {
    /// Parses the `application/x-www-form-urlencoded` wire form sent by the client.
    ///
    /// Never fails: undecodable input simply yields odd fields, which then
    /// fail signature verification.
    pub fn parse(raw: &str) -> Self {
        let fields = form_urlencoded::parse(raw.trim().as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Self { fields }
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The claimed signature.
    pub fn hash(&self) -> Option<&str> {
        self.get(HASH_FIELD)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds the data-check string: every field except `hash`, sorted by key
    /// in byte order, rendered as `key=value` and joined with `\n`.
    ///
    /// The sort is stable, so repeated keys keep their wire order.
    pub fn data_check_string(&self) -> String {
        let mut pairs: Vec<&(String, String)> = self.fields.iter().filter(|(k, _)| k != HASH_FIELD).collect();
        pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serializes back to the wire form, fields in their current order.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.fields {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }

    /// Replaces every `hash` field with `hash`, appending it last.
    pub(crate) fn set_hash(&mut self, hash: String) {
        self.fields.retain(|(k, _)| k != HASH_FIELD);
        self.fields.push((HASH_FIELD.to_string(), hash));
    }
}
