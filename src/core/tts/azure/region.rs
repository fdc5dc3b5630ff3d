//! Microsoft Azure Speech Service regions.
//!
//! See: <https://learn.microsoft.com/en-us/azure/ai-services/speech-service/regions>

use std::fmt;

/// Microsoft Azure Speech Service regions.
///
/// Choose the region closest to your users for optimal latency,
/// or use specific regions for data residency requirements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AzureRegion {
    /// East US (Virginia)
    #[default]
    EastUS,
    /// East US 2 (Virginia)
    EastUS2,
    /// West US (California)
    WestUS,
    /// West US 2 (Washington)
    WestUS2,
    /// Central US (Iowa)
    CentralUS,
    /// West Europe (Netherlands)
    WestEurope,
    /// North Europe (Ireland)
    NorthEurope,
    /// UK South (London)
    UKSouth,
    /// Germany West Central (Frankfurt)
    GermanyWestCentral,
    /// Southeast Asia (Singapore)
    SoutheastAsia,
    /// Japan East (Tokyo)
    JapanEast,
    /// Australia East (Sydney)
    AustraliaEast,
    /// India Central (Pune)
    IndiaCentral,
    /// Region not explicitly listed.
    Custom(String),
}

impl AzureRegion {
    /// Region identifier used in Azure hostnames.
    ///
    /// # Example
    ///
    /// ```rust
    /// use voxcast::core::tts::azure::AzureRegion;
    ///
    /// assert_eq!(AzureRegion::EastUS.as_str(), "eastus");
    /// assert_eq!(AzureRegion::IndiaCentral.as_str(), "centralindia");
    /// ```
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            Self::EastUS => "eastus",
            Self::EastUS2 => "eastus2",
            Self::WestUS => "westus",
            Self::WestUS2 => "westus2",
            Self::CentralUS => "centralus",
            Self::WestEurope => "westeurope",
            Self::NorthEurope => "northeurope",
            Self::UKSouth => "uksouth",
            Self::GermanyWestCentral => "germanywestcentral",
            Self::SoutheastAsia => "southeastasia",
            Self::JapanEast => "japaneast",
            Self::AustraliaEast => "australiaeast",
            Self::IndiaCentral => "centralindia",
            Self::Custom(region) => region.as_str(),
        }
    }

    /// Format: `<region>.tts.speech.microsoft.com`
    #[inline]
    pub fn tts_hostname(&self) -> String {
        format!("{}.tts.speech.microsoft.com", self.as_str())
    }

    /// Text-to-speech REST endpoint for this region.
    ///
    /// ```rust
    /// use voxcast::core::tts::azure::AzureRegion;
    ///
    /// assert_eq!(
    ///     AzureRegion::WestEurope.tts_rest_url(),
    ///     "https://westeurope.tts.speech.microsoft.com/cognitiveservices/v1"
    /// );
    /// ```
    #[inline]
    pub fn tts_rest_url(&self) -> String {
        format!("https://{}/cognitiveservices/v1", self.tts_hostname())
    }
}

impl fmt::Display for AzureRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AzureRegion {
    type Err = std::convert::Infallible;

    /// Case-insensitive. Unknown regions become `Custom(s)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Ok(match normalized.as_str() {
            "eastus" => Self::EastUS,
            "eastus2" => Self::EastUS2,
            "westus" => Self::WestUS,
            "westus2" => Self::WestUS2,
            "centralus" => Self::CentralUS,
            "westeurope" => Self::WestEurope,
            "northeurope" => Self::NorthEurope,
            "uksouth" => Self::UKSouth,
            "germanywestcentral" => Self::GermanyWestCentral,
            "southeastasia" => Self::SoutheastAsia,
            "japaneast" => Self::JapanEast,
            "australiaeast" => Self::AustraliaEast,
            "centralindia" | "indiacentral" => Self::IndiaCentral,
            _ => Self::Custom(normalized),
        })
    }
}
