use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    KoreanAir,
    Asiana,
    JejuAir,
    BookingCom,
    Agoda,
    Airbnb,
    Expedia,
    HotelsCom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Airline,
    Accommodation,
    /// Sells both flights and stays.
    Agency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DetectedBy {
    SenderDomain,
    SubjectKeyword,
}

#[derive(Debug)]
pub struct ProviderProfile {
    pub provider: Provider,
    pub display_name: &'static str,
    pub kind: ProviderKind,
    pub sender_domains: &'static [&'static str],
    /// Matched case-insensitively against the subject line.
    pub subject_keywords: &'static [&'static str],
    /// Airline designators accepted as flight number prefixes.
    pub airline_codes: &'static [&'static str],
}

/// Designators accepted from agencies, which sell every carrier.
pub const COMMON_AIRLINE_CODES: &[&str] = &[
    "KE", "OZ", "7C", "LJ", "TW", "BX", "ZE", "RS", "AF", "LH", "KL", "BA", "IB", "AZ", "LX", "OS", "SK", "AY", "TK", "EK", "QR", "SQ", "CX", "JL",
    "NH", "VN", "TG", "LO",
];

pub const PROFILES: &[ProviderProfile] = &[
    ProviderProfile {
        provider: Provider::KoreanAir,
        display_name: "Korean Air",
        kind: ProviderKind::Airline,
        sender_domains: &["koreanair.com"],
        subject_keywords: &["korean air", "대한항공"],
        airline_codes: &["KE"],
    },
    ProviderProfile {
        provider: Provider::Asiana,
        display_name: "Asiana Airlines",
        kind: ProviderKind::Airline,
        sender_domains: &["flyasiana.com"],
        subject_keywords: &["asiana", "아시아나"],
        airline_codes: &["OZ"],
    },
    ProviderProfile {
        provider: Provider::JejuAir,
        display_name: "Jeju Air",
        kind: ProviderKind::Airline,
        sender_domains: &["jejuair.net"],
        subject_keywords: &["jeju air", "제주항공"],
        airline_codes: &["7C"],
    },
    ProviderProfile {
        provider: Provider::BookingCom,
        display_name: "Booking.com",
        kind: ProviderKind::Accommodation,
        sender_domains: &["booking.com"],
        subject_keywords: &["booking.com"],
        airline_codes: &[],
    },
    ProviderProfile {
        provider: Provider::Agoda,
        display_name: "Agoda",
        kind: ProviderKind::Accommodation,
        sender_domains: &["agoda.com", "agoda-mail.com"],
        subject_keywords: &["agoda", "아고다"],
        airline_codes: &[],
    },
    ProviderProfile {
        provider: Provider::Airbnb,
        display_name: "Airbnb",
        kind: ProviderKind::Accommodation,
        sender_domains: &["airbnb.com"],
        subject_keywords: &["airbnb", "에어비앤비"],
        airline_codes: &[],
    },
    ProviderProfile {
        provider: Provider::Expedia,
        display_name: "Expedia",
        kind: ProviderKind::Agency,
        sender_domains: &["expedia.com", "expediamail.com"],
        subject_keywords: &["expedia", "익스피디아"],
        airline_codes: COMMON_AIRLINE_CODES,
    },
    ProviderProfile {
        provider: Provider::HotelsCom,
        display_name: "Hotels.com",
        kind: ProviderKind::Accommodation,
        sender_domains: &["hotels.com"],
        subject_keywords: &["hotels.com"],
        airline_codes: &[],
    },
];

impl Provider {
    pub fn profile(self) -> &'static ProviderProfile {
        PROFILES
            .iter()
            .find(|profile| profile.provider == self)
            .unwrap_or(&PROFILES[0])
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().display_name)
    }
}

/// Domain part of a sender such as `"Korean Air" <noreply@koreanair.com>`.
pub fn sender_domain(sender: &str) -> Option<String> {
    let (_, domain) = sender.rsplit_once('@')?;
    let domain = domain.trim().trim_end_matches('>').trim().to_ascii_lowercase();
    (!domain.is_empty()).then_some(domain)
}

fn domain_matches(domain: &str, expected: &str) -> bool {
    domain == expected || domain.strip_suffix(expected).is_some_and(|prefix| prefix.ends_with('.'))
}

/// Sender domain wins over subject keywords.
pub fn detect_provider(sender: &str, subject: &str) -> Option<(&'static ProviderProfile, DetectedBy)> {
    if let Some(domain) = sender_domain(sender)
        && let Some(profile) = PROFILES
            .iter()
            .find(|profile| profile.sender_domains.iter().any(|expected| domain_matches(&domain, expected)))
    {
        return Some((profile, DetectedBy::SenderDomain));
    }

    let subject = subject.to_lowercase();
    PROFILES
        .iter()
        .find(|profile| profile.subject_keywords.iter().any(|keyword| subject.contains(keyword)))
        .map(|profile| (profile, DetectedBy::SubjectKeyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_sender_domain() {
        assert_eq!(sender_domain("\"Korean Air\" <NoReply@KoreanAir.com>").as_deref(), Some("koreanair.com"));
        assert_eq!(sender_domain("reservations@booking.com").as_deref(), Some("booking.com"));
        assert_eq!(sender_domain("no address here"), None);
    }

    #[test]
    fn detects_by_domain_including_subdomains() {
        let (profile, by) = detect_provider("noreply@mail.flyasiana.com", "Your itinerary").unwrap();
        assert_eq!(profile.provider, Provider::Asiana);
        assert_eq!(by, DetectedBy::SenderDomain);
    }

    #[test]
    fn lookalike_domains_do_not_match() {
        assert!(detect_provider("promo@notbooking.com", "Weekly deals").is_none());
    }

    #[test]
    fn falls_back_to_subject_keywords() {
        let (profile, by) = detect_provider("friend@gmail.com", "Fwd: [대한항공] 예약 확인").unwrap();
        assert_eq!(profile.provider, Provider::KoreanAir);
        assert_eq!(by, DetectedBy::SubjectKeyword);

        let (profile, _) = detect_provider("me@example.com", "FW: Agoda booking confirmation").unwrap();
        assert_eq!(profile.provider, Provider::Agoda);
    }

    #[test]
    fn every_provider_has_a_profile() {
        for provider in [
            Provider::KoreanAir,
            Provider::Asiana,
            Provider::JejuAir,
            Provider::BookingCom,
            Provider::Agoda,
            Provider::Airbnb,
            Provider::Expedia,
            Provider::HotelsCom,
        ] {
            assert_eq!(provider.profile().provider, provider);
        }
    }
}
