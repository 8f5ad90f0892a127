//! GST identification numbers.
//!
//! A GSTIN is 15 characters: a two-digit state code, the holder's 10-character
//! PAN, an entity number, the literal `Z`, and a base-36 check character.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shipping::ShippingAddress;

const GSTIN_LEN: usize = 15;
const CHARSET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Errors that can occur when parsing a GSTIN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GstinError {
    #[error("GSTIN must be {GSTIN_LEN} characters (got {0})")]
    Length(usize),
    #[error("GSTIN may only contain letters and digits")]
    Charset,
    #[error("unknown GST state code {0}")]
    StateCode(String),
    #[error("GSTIN does not contain a valid PAN")]
    Pan,
    #[error("GSTIN entity number must be a letter or a non-zero digit")]
    EntityNumber,
    #[error("GSTIN must have 'Z' as its 14th character")]
    MissingZ,
    #[error("GSTIN checksum does not match")]
    Checksum,
}

/// A validated GSTIN, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gstin(String);

impl Gstin {
    /// Parse and validate a GSTIN. Surrounding whitespace is ignored and
    /// letters are uppercased.
    ///
    /// # Errors
    ///
    /// Returns the first [`GstinError`] found, checked in the order length,
    /// characters, state code, PAN, entity number, `Z`, checksum.
    pub fn parse(input: &str) -> Result<Self, GstinError> {
        let value = input.trim().to_ascii_uppercase();
        let Ok(chars) = <[u8; GSTIN_LEN]>::try_from(value.as_bytes()) else {
            return Err(GstinError::Length(value.chars().count()));
        };
        if !chars.iter().all(u8::is_ascii_alphanumeric) {
            return Err(GstinError::Charset);
        }

        let [s1, s2, pan @ .., entity, z, check] = chars;
        let code = String::from_utf8_lossy(&[s1, s2]).into_owned();
        if state_name(&code).is_none() {
            return Err(GstinError::StateCode(code));
        }

        if !is_pan(&pan) {
            return Err(GstinError::Pan);
        }
        if entity == b'0' {
            return Err(GstinError::EntityNumber);
        }
        if z != b'Z' {
            return Err(GstinError::MissingZ);
        }
        let [body @ .., _] = chars;
        if checksum_char(&body) != Some(check) {
            return Err(GstinError::Checksum);
        }

        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn state_code(&self) -> &str {
        self.0.get(..2).unwrap_or_default()
    }

    /// Registered state or union territory name.
    #[must_use]
    pub fn state(&self) -> &'static str {
        state_name(self.state_code()).unwrap_or_default()
    }

    /// The PAN embedded in characters 3 to 12.
    #[must_use]
    pub fn pan(&self) -> &str {
        self.0.get(2..12).unwrap_or_default()
    }
}

/// Five letters, four digits, one letter.
fn is_pan(pan: &[u8; 10]) -> bool {
    let (letters, rest) = pan.split_at(5);
    let (digits, last) = rest.split_at(4);
    letters.iter().all(u8::is_ascii_uppercase)
        && digits.iter().all(u8::is_ascii_digit)
        && last.iter().all(u8::is_ascii_uppercase)
}

/// Base-36 check character over the first 14 characters: alternate weights
/// 1 and 2, fold each product as `quotient + remainder` in base 36.
fn checksum_char(body: &[u8]) -> Option<u8> {
    let mut sum = 0usize;
    for (i, c) in body.iter().enumerate() {
        let value = CHARSET.iter().position(|x| x == c)?;
        let product = value * if i % 2 == 0 { 1 } else { 2 };
        sum += product / 36 + product % 36;
    }
    CHARSET.get((36 - sum % 36) % 36).copied()
}

impl fmt::Display for Gstin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Gstin {
    type Err = GstinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Gstin {
    type Error = GstinError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Gstin> for String {
    fn from(gstin: Gstin) -> Self {
        gstin.0
    }
}

/// State name for a GST state code.
#[must_use]
pub fn state_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "01" => "Jammu and Kashmir",
        "02" => "Himachal Pradesh",
        "03" => "Punjab",
        "04" => "Chandigarh",
        "05" => "Uttarakhand",
        "06" => "Haryana",
        "07" => "Delhi",
        "08" => "Rajasthan",
        "09" => "Uttar Pradesh",
        "10" => "Bihar",
        "11" => "Sikkim",
        "12" => "Arunachal Pradesh",
        "13" => "Nagaland",
        "14" => "Manipur",
        "15" => "Mizoram",
        "16" => "Tripura",
        "17" => "Meghalaya",
        "18" => "Assam",
        "19" => "West Bengal",
        "20" => "Jharkhand",
        "21" => "Odisha",
        "22" => "Chhattisgarh",
        "23" => "Madhya Pradesh",
        "24" => "Gujarat",
        "25" | "26" => "Dadra and Nagar Haveli and Daman and Diu",
        "27" => "Maharashtra",
        "28" | "37" => "Andhra Pradesh",
        "29" => "Karnataka",
        "30" => "Goa",
        "31" => "Lakshadweep",
        "32" => "Kerala",
        "33" => "Tamil Nadu",
        "34" => "Puducherry",
        "35" => "Andaman and Nicobar Islands",
        "36" => "Telangana",
        "38" => "Ladakh",
        "97" => "Other Territory",
        "99" => "Centre Jurisdiction",
        _ => return None,
    };
    Some(name)
}

/// Address fields filled in from a GST registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GstAutofill {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub gst: String,
    pub pancard: String,
}

impl GstAutofill {
    /// Fields derivable from the number alone: state, country and PAN.
    #[must_use]
    pub fn from_gstin(gstin: &Gstin) -> Self {
        Self {
            full_name: String::new(),
            address: String::new(),
            city: String::new(),
            state: gstin.state().to_owned(),
            zip_code: String::new(),
            country: "India".to_owned(),
            gst: gstin.to_string(),
            pancard: gstin.pan().to_owned(),
        }
    }

    /// Overlay registry details. Blank values keep what the number implies.
    #[must_use]
    pub fn with_registration(
        mut self,
        legal_name: Option<&str>,
        address: Option<&str>,
        city: Option<&str>,
        state: Option<&str>,
        zip_code: Option<&str>,
    ) -> Self {
        fn set(field: &mut String, value: Option<&str>) {
            if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
                v.clone_into(field);
            }
        }
        set(&mut self.full_name, legal_name);
        set(&mut self.address, address);
        set(&mut self.city, city);
        set(&mut self.state, state);
        set(&mut self.zip_code, zip_code);
        self
    }

    /// Apply onto an address form, leaving the contact number alone.
    pub fn apply_to(&self, target: &mut ShippingAddress) {
        if !self.full_name.is_empty() {
            target.full_name.clone_from(&self.full_name);
        }
        if !self.address.is_empty() {
            target.address.clone_from(&self.address);
        }
        if !self.city.is_empty() {
            target.city.clone_from(&self.city);
        }
        if !self.zip_code.is_empty() {
            target.zip_code.clone_from(&self.zip_code);
        }
        target.state.clone_from(&self.state);
        target.country.clone_from(&self.country);
        target.gst = Some(self.gst.clone());
        target.pancard = Some(self.pancard.clone());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_gstins() {
        for raw in ["27AAPFU0939F1ZV", "29AAGCB7383J1Z4", "24AAACC1206D1ZM"] {
            assert!(Gstin::parse(raw).is_ok(), "{raw} should be valid");
        }
    }

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let gstin = Gstin::parse("  24aaacc1206d1zm ").unwrap();
        assert_eq!(gstin.as_str(), "24AAACC1206D1ZM");
        assert_eq!(gstin.state(), "Gujarat");
        assert_eq!(gstin.pan(), "AAACC1206D");
    }

    #[test]
    fn test_checksum_mismatch() {
        assert_eq!(Gstin::parse("24AAACC1206D1ZN"), Err(GstinError::Checksum));
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(Gstin::parse("24AAACC1206D1Z"), Err(GstinError::Length(14)));
        assert_eq!(Gstin::parse("24AAACC1206D1Z-"), Err(GstinError::Charset));
        assert_eq!(
            Gstin::parse("40AAACC1206D1ZM"),
            Err(GstinError::StateCode("40".to_string()))
        );
        assert_eq!(Gstin::parse("24AAAC11206D1ZM"), Err(GstinError::Pan));
        assert_eq!(Gstin::parse("24AAACC1206D0ZM"), Err(GstinError::EntityNumber));
        assert_eq!(Gstin::parse("24AAACC1206D1YM"), Err(GstinError::MissingZ));
    }

    #[test]
    fn test_non_ascii_input_is_rejected_without_panicking() {
        assert_eq!(Gstin::parse("24AAACC1206D1ZÉ"), Err(GstinError::Length(15)));
        assert_eq!(Gstin::parse("2४ACC1206D1ZM"), Err(GstinError::Charset));
        assert_eq!(Gstin::parse(""), Err(GstinError::Length(0)));
    }

    #[test]
    fn test_serde_validates() {
        let gstin: Gstin = serde_json::from_str("\"27AAPFU0939F1ZV\"").unwrap();
        assert_eq!(gstin.state(), "Maharashtra");
        assert!(serde_json::from_str::<Gstin>("\"27AAPFU0939F1ZA\"").is_err());
    }

    #[test]
    fn test_autofill_keeps_derived_state_when_registry_blank() {
        let gstin = Gstin::parse("24AAACC1206D1ZM").unwrap();
        let fill = GstAutofill::from_gstin(&gstin).with_registration(
            Some("Lustre Jewels Pvt Ltd"),
            Some("4 Diamond Market, Varachha"),
            Some("Surat"),
            Some("  "),
            Some("395006"),
        );
        assert_eq!(fill.state, "Gujarat");
        assert_eq!(fill.country, "India");
        assert_eq!(fill.pancard, "AAACC1206D");

        let mut address = ShippingAddress {
            mobile_no: "9876543210".to_string(),
            ..ShippingAddress::default()
        };
        fill.apply_to(&mut address);
        assert_eq!(address.city, "Surat");
        assert_eq!(address.mobile_no, "9876543210");
        assert_eq!(address.gst.as_deref(), Some("24AAACC1206D1ZM"));
    }
}
