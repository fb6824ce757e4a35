use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;
use std::time::Duration;

use super::init_data::InitData;
use super::{Principal, VerificationFailure};

type HmacSha256 = Hmac<Sha256>;

/// Constant Telegram uses to key the secret-key derivation.
const WEB_APP_DATA: &[u8] = b"WebAppData";

/// Length of a hex-encoded HMAC-SHA256 digest.
const HASH_HEX_LEN: usize = 64;

/// Verifies Telegram Mini App init data against one bot token.
///
/// Telegram signs init data with HMAC-SHA256. The HMAC key is itself
/// `HMAC_SHA256(key = "WebAppData", msg = bot_token)`, derived once here.
///
/// # Example
/// ```rust
/// use seedcore::auth::{sign_init_data, InitDataVerifier};
///
/// let init_data = sign_init_data([("auth_date", "1700000000"), ("user", r#"{"id":42}"#)], "BOTTOKEN");
/// let verifier = InitDataVerifier::new("BOTTOKEN");
/// assert_eq!(verifier.verify(&init_data).unwrap().id(), 42);
/// ```
#[derive(Clone)]
pub struct InitDataVerifier {
    secret_key: [u8; 32],
    max_age: Option<Duration>,
}

impl InitDataVerifier {
    /// Creates a verifier with no freshness check.
    pub fn new(bot_token: &str) -> Self {
        Self {
            secret_key: derive_secret_key(bot_token),
            max_age: None,
        }
    }

    /// Rejects init data whose `auth_date` is older than `max_age`.
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Verifies `raw` init data as of the current time.
    pub fn verify(&self, raw: &str) -> Result<Principal, VerificationFailure> {
        self.verify_at(raw, chrono::Utc::now().timestamp())
    }

    /// Verifies `raw` init data as of `now` (Unix seconds).
    pub fn verify_at(&self, raw: &str, now: i64) -> Result<Principal, VerificationFailure> {
        let data = InitData::parse(raw);
        let claimed = data.hash().ok_or(VerificationFailure::MalformedPayload)?;

        if !self.signature_matches(&data, claimed) {
            return Err(VerificationFailure::SignatureMismatch);
        }

        if let Some(max_age) = self.max_age {
            let auth_date = data
                .get("auth_date")
                .and_then(|v| v.parse::<i64>().ok())
                .ok_or(VerificationFailure::MalformedPayload)?;
            let age = now.saturating_sub(auth_date);
            if age > i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX) {
                return Err(VerificationFailure::Expired { age_secs: age });
            }
        }

        let user = data.get("user").ok_or(VerificationFailure::MissingIdentity)?;
        let user: WebAppUser = serde_json::from_str(user).map_err(|_| VerificationFailure::MissingIdentity)?;

        Ok(Principal::new(user.id).with_username(user.username))
    }

    /// Lowercase hex HMAC of the data-check string.
    pub fn expected_hash(&self, data: &InitData) -> String {
        hex::encode(self.mac_for(data).finalize().into_bytes())
    }

    /// Constant-time check of `claimed` against the expected MAC.
    ///
    /// Only the exact rendering Telegram produces (64 lowercase hex digits)
    /// is accepted.
    fn signature_matches(&self, data: &InitData, claimed: &str) -> bool {
        let well_formed = claimed.len() == HASH_HEX_LEN
            && claimed.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return false;
        }

        match hex::decode(claimed) {
            Ok(bytes) => self.mac_for(data).verify_slice(&bytes).is_ok(),
            Err(_) => false,
        }
    }

    fn mac_for(&self, data: &InitData) -> HmacSha256 {
        let mut mac = new_mac(&self.secret_key);
        mac.update(data.data_check_string().as_bytes());
        mac
    }
}

impl fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitDataVerifier")
            .field("secret_key", &"[redacted]")
            .field("max_age", &self.max_age)
            .finish()
    }
}

/// Validates Telegram Web App init data and returns the authenticated user.
///
/// One-shot form of [`InitDataVerifier`]; no freshness check.
pub fn verify(init_data: &str, bot_token: &str) -> Result<Principal, VerificationFailure> {
    InitDataVerifier::new(bot_token).verify(init_data)
}

/// Signs `fields` the way Telegram does and returns the wire form with `hash` appended.
///
/// Any `hash` already present in `fields` is replaced.
pub fn sign_init_data<K, V, I>(fields: I, bot_token: &str) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut data = InitData::from_pairs(fields);
    let hash = InitDataVerifier::new(bot_token).expected_hash(&data);
    data.set_hash(hash);
    data.to_query_string()
}

/// `secret_key = HMAC_SHA256(key = "WebAppData", msg = bot_token)`
fn derive_secret_key(bot_token: &str) -> [u8; 32] {
    let mut mac = new_mac(WEB_APP_DATA);
    mac.update(bot_token.as_bytes());

    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    key
}

#[allow(clippy::expect_used)]
fn new_mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC can take key of any size")
}

/// The `user` field of init data. Only `id` is required.
#[derive(Debug, Deserialize)]
struct WebAppUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BOT_TOKEN: &str = "BOTTOKEN";
    const NOW: i64 = 1_700_000_100;

    fn scenario_a() -> String {
        sign_init_data([("auth_date", "1700000000"), ("user", r#"{"id":42}"#)], BOT_TOKEN)
    }

    /// Recomputes the HMAC chain by hand, independent of `InitDataVerifier`.
    fn reference_hash(data_check_string: &str, bot_token: &str) -> String {
        let mut secret = HmacSha256::new_from_slice(b"WebAppData").unwrap();
        secret.update(bot_token.as_bytes());
        let secret = secret.finalize().into_bytes();

        let mut mac = HmacSha256::new_from_slice(&secret).unwrap();
        mac.update(data_check_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_scenario_a_valid_payload() {
        let principal = verify(&scenario_a(), BOT_TOKEN).unwrap();
        assert_eq!(principal.id(), 42);
    }

    #[test]
    fn test_scenario_b_changed_hash() {
        let data = InitData::parse(&scenario_a());
        let original = data.hash().unwrap().to_string();
        let forged = if original.starts_with('0') {
            format!("1{}", &original[1..])
        } else {
            format!("0{}", &original[1..])
        };
        let tampered = scenario_a().replace(&original, &forged);

        assert_eq!(verify(&tampered, BOT_TOKEN), Err(VerificationFailure::SignatureMismatch));
    }

    #[test]
    fn test_accepted_hash_matches_reference_chain() {
        let raw = scenario_a();
        let data = InitData::parse(&raw);
        assert!(verify(&raw, BOT_TOKEN).is_ok());

        assert_eq!(
            reference_hash(&data.data_check_string(), BOT_TOKEN),
            data.hash().unwrap()
        );
        assert_eq!(
            data.data_check_string(),
            "auth_date=1700000000\nuser={\"id\":42}"
        );
    }

    #[test]
    fn test_single_character_tamper_in_any_field_fails() {
        let fields = [
            ("auth_date", "1700000000"),
            ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
            ("user", r#"{"id":42,"first_name":"Ann","username":"ann"}"#),
        ];
        let signed = InitData::parse(&sign_init_data(fields, BOT_TOKEN));
        let hash = signed.hash().unwrap().to_string();

        for (field_idx, (_, value)) in fields.iter().enumerate() {
            for pos in 0..value.len() {
                let mut bytes = value.as_bytes().to_vec();
                bytes[pos] = if bytes[pos] == b'1' { b'2' } else { b'1' };
                let tampered_value = String::from_utf8(bytes).unwrap();

                let mut pairs: Vec<(String, String)> =
                    fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
                pairs[field_idx].1 = tampered_value;
                pairs.push(("hash".to_string(), hash.clone()));
                let raw = InitData::from_pairs(pairs).to_query_string();

                assert_eq!(
                    verify(&raw, BOT_TOKEN),
                    Err(VerificationFailure::SignatureMismatch),
                    "tamper of field {} at {} was accepted",
                    field_idx,
                    pos
                );
            }
        }
    }

    #[test]
    fn test_wrong_bot_token() {
        assert_eq!(
            verify(&scenario_a(), "OTHERTOKEN"),
            Err(VerificationFailure::SignatureMismatch)
        );
    }

    #[test]
    fn test_missing_hash() {
        let init_data = "user={\"id\":123}&auth_date=1234567890";
        assert_eq!(verify(init_data, BOT_TOKEN), Err(VerificationFailure::MalformedPayload));
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(verify("", BOT_TOKEN), Err(VerificationFailure::MalformedPayload));
    }

    #[test]
    fn test_uppercase_hash_rejected() {
        let raw = scenario_a();
        let hash = InitData::parse(&raw).hash().unwrap().to_string();
        let upper = raw.replace(&hash, &hash.to_uppercase());

        assert_eq!(verify(&upper, BOT_TOKEN), Err(VerificationFailure::SignatureMismatch));
    }

    #[test]
    fn test_non_hex_hash_rejected() {
        let raw = sign_init_data([("user", r#"{"id":42}"#)], BOT_TOKEN);
        let hash = InitData::parse(&raw).hash().unwrap().to_string();
        let bad = raw.replace(&hash, &"z".repeat(64));

        assert_eq!(verify(&bad, BOT_TOKEN), Err(VerificationFailure::SignatureMismatch));
    }

    #[test]
    fn test_missing_user_is_missing_identity() {
        let raw = sign_init_data([("auth_date", "1700000000")], BOT_TOKEN);
        assert_eq!(verify(&raw, BOT_TOKEN), Err(VerificationFailure::MissingIdentity));
    }

    #[test]
    fn test_unparseable_user_is_missing_identity() {
        let raw = sign_init_data([("user", "not json")], BOT_TOKEN);
        assert_eq!(verify(&raw, BOT_TOKEN), Err(VerificationFailure::MissingIdentity));

        let raw = sign_init_data([("user", r#"{"id":"42"}"#)], BOT_TOKEN);
        assert_eq!(verify(&raw, BOT_TOKEN), Err(VerificationFailure::MissingIdentity));
    }

    #[test]
    fn test_username_carried_and_extra_fields_ignored() {
        let raw = sign_init_data(
            [("user", r#"{"id":7,"first_name":"Ann","username":"ann","language_code":"ko"}"#)],
            BOT_TOKEN,
        );
        let principal = verify(&raw, BOT_TOKEN).unwrap();

        assert_eq!(principal.id(), 7);
        assert_eq!(principal.username(), Some("ann"));
        assert_eq!(principal.to_string(), "7 (@ann)");
    }

    #[test]
    fn test_max_age_accepts_fresh_data() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).with_max_age(Some(Duration::from_secs(86400)));
        assert_eq!(verifier.verify_at(&scenario_a(), NOW).unwrap().id(), 42);
    }

    #[test]
    fn test_max_age_rejects_stale_data() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).with_max_age(Some(Duration::from_secs(60)));
        assert_eq!(
            verifier.verify_at(&scenario_a(), NOW),
            Err(VerificationFailure::Expired { age_secs: 100 })
        );
    }

    #[test]
    fn test_max_age_requires_auth_date() {
        let raw = sign_init_data([("user", r#"{"id":42}"#)], BOT_TOKEN);
        let verifier = InitDataVerifier::new(BOT_TOKEN).with_max_age(Some(Duration::from_secs(60)));
        assert_eq!(verifier.verify_at(&raw, NOW), Err(VerificationFailure::MalformedPayload));
    }

    #[test]
    fn test_signature_checked_before_freshness() {
        let raw = scenario_a().replace("1700000000", "1700000099");
        let verifier = InitDataVerifier::new(BOT_TOKEN).with_max_age(Some(Duration::from_secs(60)));
        assert_eq!(verifier.verify_at(&raw, NOW), Err(VerificationFailure::SignatureMismatch));
    }

    #[test]
    fn test_debug_hides_secret_key() {
        let verifier = InitDataVerifier::new(BOT_TOKEN);
        let debug = format!("{:?}", verifier);
        assert!(debug.contains("[redacted]"));
    }
}
