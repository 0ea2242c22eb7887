//! Audit record envelope and the enumerations it references.
//!
//! The envelope fields are all optional because the upstream schema omits
//! them inconsistently between workloads; type-specific fields are kept as
//! raw JSON instead of one struct per event family.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines an integer-backed API enumeration together with its string
/// literals, keeping value / literal / variant in a single table.
macro_rules! api_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident = $value:literal => $literal:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum $name {
            $($variant = $value,)+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $literal,)+
                }
            }

            pub fn from_literal(s: &str) -> Option<Self> {
                match s {
                    $($literal => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn from_value(v: i64) -> Option<Self> {
                match v {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn value(self) -> i32 {
                self as i32
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_i32(self.value())
            }
        }
    };
}

api_enum! {
    /// Identifies the kind of event an [`AuditRecord`] describes.
    ///
    /// Values and literals follow the AuditLogRecordType enumeration of the
    /// Management Activity API schema.
    RecordType {
        ExchangeAdmin = 1 => "ExchangeAdmin",
        ExchangeItem = 2 => "ExchangeItem",
        ExchangeItemGroup = 3 => "ExchangeItemGroup",
        SharePoint = 4 => "SharePoint",
        SharePointFileOperation = 6 => "SharePointFileOperation",
        OneDrive = 7 => "OneDrive",
        AzureActiveDirectory = 8 => "AzureActiveDirectory",
        AzureActiveDirectoryAccountLogon = 9 => "AzureActiveDirectoryAccountLogon",
        DataCenterSecurityCmdlet = 10 => "DataCenterSecurityCmdlet",
        ComplianceDlpSharePoint = 11 => "ComplianceDLPSharePoint",
        ComplianceDlpExchange = 13 => "ComplianceDLPExchange",
        SharePointSharingOperation = 14 => "SharePointSharingOperation",
        AzureActiveDirectoryStsLogon = 15 => "AzureActiveDirectoryStsLogon",
        SkypeForBusinessPstnUsage = 16 => "SkypeForBusinessPSTNUsage",
        SkypeForBusinessUsersBlocked = 17 => "SkypeForBusinessUsersBlocked",
        SecurityComplianceCenterEopCmdlet = 18 => "SecurityComplianceCenterEOPCmdlet",
        ExchangeAggregatedOperation = 19 => "ExchangeAggregatedOperation",
        PowerBiAudit = 20 => "PowerBIAudit",
        Crm = 21 => "CRM",
        Yammer = 22 => "Yammer",
        SkypeForBusinessCmdlets = 23 => "SkypeForBusinessCmdlets",
        Discovery = 24 => "Discovery",
        MicrosoftTeams = 25 => "MicrosoftTeams",
        ThreatIntelligence = 28 => "ThreatIntelligence",
        MailSubmission = 29 => "MailSubmission",
        MicrosoftFlow = 30 => "MicrosoftFlow",
        AeD = 31 => "AeD",
        MicrosoftStream = 32 => "MicrosoftStream",
        ComplianceDlpSharePointClassification = 33 => "ComplianceDLPSharePointClassification",
        ThreatFinder = 34 => "ThreatFinder",
        Project = 35 => "Project",
        SharePointListOperation = 36 => "SharePointListOperation",
        SharePointCommentOperation = 37 => "SharePointCommentOperation",
        DataGovernance = 38 => "DataGovernance",
        Kaizala = 39 => "Kaizala",
        SecurityComplianceAlerts = 40 => "SecurityComplianceAlerts",
        ThreatIntelligenceUrl = 41 => "ThreatIntelligenceUrl",
        SecurityComplianceInsights = 42 => "SecurityComplianceInsights",
        MipLabel = 43 => "MIPLabel",
        WorkplaceAnalytics = 44 => "WorkplaceAnalytics",
        PowerAppsApp = 45 => "PowerAppsApp",
        PowerAppsPlan = 46 => "PowerAppsPlan",
        ThreatIntelligenceAtpContent = 47 => "ThreatIntelligenceAtpContent",
        LabelContentExplorer = 48 => "LabelContentExplorer",
        TeamsHealthcare = 49 => "TeamsHealthcare",
        ExchangeItemAggregated = 50 => "ExchangeItemAggregated",
        HygieneEvent = 51 => "HygieneEvent",
        DataInsightsRestApiAudit = 52 => "DataInsightsRestApiAudit",
        InformationBarrierPolicyApplication = 53 => "InformationBarrierPolicyApplication",
        SharePointListItemOperation = 54 => "SharePointListItemOperation",
        SharePointContentTypeOperation = 55 => "SharePointContentTypeOperation",
        SharePointFieldOperation = 56 => "SharePointFieldOperation",
        MicrosoftTeamsAdmin = 57 => "MicrosoftTeamsAdmin",
        HrSignal = 58 => "HRSignal",
        MicrosoftTeamsDevice = 59 => "MicrosoftTeamsDevice",
        MicrosoftTeamsAnalytics = 60 => "MicrosoftTeamsAnalytics",
        InformationWorkerProtection = 61 => "InformationWorkerProtection",
        Campaign = 62 => "Campaign",
        DlpEndpoint = 63 => "DLPEndpoint",
        AirInvestigation = 64 => "AirInvestigation",
        Quarantine = 65 => "Quarantine",
        MicrosoftForms = 66 => "MicrosoftForms",
        ApplicationAudit = 67 => "ApplicationAudit",
        ComplianceSupervisionExchange = 68 => "ComplianceSupervisionExchange",
        CustomerKeyServiceEncryption = 69 => "CustomerKeyServiceEncryption",
        OfficeNative = 70 => "OfficeNative",
        MipAutoLabelSharePointItem = 71 => "MipAutoLabelSharePointItem",
        MipAutoLabelSharePointPolicyLocation = 72 => "MipAutoLabelSharePointPolicyLocation",
        MicrosoftTeamsShifts = 73 => "MicrosoftTeamsShifts",
        MipAutoLabelExchangeItem = 75 => "MipAutoLabelExchangeItem",
        CortanaBriefing = 76 => "CortanaBriefing",
        WdatpAlerts = 78 => "WDATPAlerts",
        SensitivityLabelPolicyMatch = 82 => "SensitivityLabelPolicyMatch",
        SensitivityLabelAction = 83 => "SensitivityLabelAction",
        SensitivityLabeledFileAction = 84 => "SensitivityLabeledFileAction",
        AttackSim = 85 => "AttackSim",
        AirManualInvestigation = 86 => "AirManualInvestigation",
        SecurityComplianceRbac = 87 => "SecurityComplianceRBAC",
        UserTraining = 88 => "UserTraining",
        AirAdminActionInvestigation = 89 => "AirAdminActionInvestigation",
        Mstic = 90 => "MSTIC",
        PhysicalBadgingSignal = 91 => "PhysicalBadgingSignal",
        AipDiscover = 93 => "AipDiscover",
        AipSensitivityLabelAction = 94 => "AipSensitivityLabelAction",
        AipProtectionAction = 95 => "AipProtectionAction",
        AipFileDeleted = 96 => "AipFileDeleted",
        AipHeartBeat = 97 => "AipHeartBeat",
        McasAlerts = 98 => "MCASAlerts",
        OnPremisesFileShareScannerDlp = 99 => "OnPremisesFileShareScannerDlp",
        OnPremisesSharePointScannerDlp = 100 => "OnPremisesSharePointScannerDlp",
        ExchangeSearch = 101 => "ExchangeSearch",
        SharePointSearch = 102 => "SharePointSearch",
        PrivacyInsights = 103 => "PrivacyInsights",
        MyAnalyticsSettings = 105 => "MyAnalyticsSettings",
        SecurityComplianceUserChange = 106 => "SecurityComplianceUserChange",
        ComplianceDlpExchangeClassification = 107 => "ComplianceDLPExchangeClassification",
        MipExactDataMatch = 109 => "MipExactDataMatch",
        Ms365DCustomDetection = 113 => "MS365DCustomDetection",
        CoreReportingSettings = 147 => "CoreReportingSettings",
        ComplianceConnector = 148 => "ComplianceConnector",
        OmePortal = 154 => "OMEPortal",
        DataShareOperation = 174 => "DataShareOperation",
        EduDataLakeDownloadOperation = 181 => "EduDataLakeDownloadOperation",
        MicrosoftGraphDataConnectOperation = 183 => "MicrosoftGraphDataConnectOperation",
        PowerPagesSite = 186 => "PowerPagesSite",
        PlannerPlan = 188 => "PlannerPlan",
        PlannerCopyPlan = 189 => "PlannerCopyPlan",
        PlannerTask = 190 => "PlannerTask",
        PlannerRoster = 191 => "PlannerRoster",
        PlannerPlanList = 192 => "PlannerPlanList",
        PlannerTaskList = 193 => "PlannerTaskList",
        PlannerTenantSettings = 194 => "PlannerTenantSettings",
        ProjectForTheWebProject = 195 => "ProjectForTheWebProject",
        ProjectForTheWebTask = 196 => "ProjectForTheWebTask",
        ProjectForTheWebRoadmap = 197 => "ProjectForTheWebRoadmap",
        ProjectForTheWebRoadmapItem = 198 => "ProjectForTheWebRoadmapItem",
        ProjectForTheWebProjectSettings = 199 => "ProjectForTheWebProjectSettings",
        ProjectForTheWebRoadmapSettings = 200 => "ProjectForTheWebRoadmapSettings",
        MicrosoftTodoAudit = 202 => "MicrosoftTodoAudit",
        VivaGoals = 216 => "VivaGoals",
        MicrosoftGraphDataConnectConsent = 217 => "MicrosoftGraphDataConnectConsent",
        AttackSimAdmin = 218 => "AttackSimAdmin",
        TeamsUpdates = 230 => "TeamsUpdates",
        PlannerRosterSensitivityLabel = 231 => "PlannerRosterSensitivityLabel",
        DefenderExpertsForXdrAdmin = 237 => "DefenderExpertsforXDRAdmin",
        VfamCreatePolicy = 251 => "VfamCreatePolicy",
        VfamUpdatePolicy = 252 => "VfamUpdatePolicy",
        VfamDeletePolicy = 253 => "VfamDeletePolicy",
        CopilotInteraction = 261 => "CopilotInteraction",
    }
}

impl<'de> Deserialize<'de> for RecordType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => RecordType::from_value(v)
                .ok_or_else(|| de::Error::custom(format!("unexpected audit log record type {v}"))),
            // A known literal, or a number the producer quoted as a string.
            Raw::Text(s) => RecordType::from_literal(&s)
                .or_else(|| s.parse::<i64>().ok().and_then(RecordType::from_value))
                .ok_or_else(|| {
                    de::Error::custom(format!("unexpected audit log record type {s:?}"))
                }),
        }
    }
}

api_enum! {
    /// Kind of user that performed the recorded action.
    UserType {
        Regular = 0 => "Regular",
        Reserved = 1 => "Reserved",
        Admin = 2 => "Admin",
        DcAdmin = 3 => "DcAdmin",
        System = 4 => "System",
        Application = 5 => "Application",
        ServicePrincipal = 6 => "ServicePrincipal",
        CustomPolicy = 7 => "CustomPolicy",
        SystemPolicy = 8 => "SystemPolicy",
    }
}

impl<'de> Deserialize<'de> for UserType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = i64::deserialize(deserializer)?;
        UserType::from_value(v)
            .ok_or_else(|| de::Error::custom(format!("unexpected user type {v}")))
    }
}

api_enum! {
    /// Whether the record originates from the cloud service or an on-premises
    /// deployment.
    AuditLogScope {
        Online = 0 => "Online",
        Onprem = 1 => "Onprem",
    }
}

impl<'de> Deserialize<'de> for AuditLogScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = i64::deserialize(deserializer)?;
        AuditLogScope::from_value(v)
            .ok_or_else(|| de::Error::custom(format!("unexpected audit log scope {v}")))
    }
}

/// A single event returned by the `audit/{contentId}` endpoint.
///
/// Workload-specific properties beyond the common envelope are preserved
/// verbatim in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
    #[serde(rename = "RecordType", default)]
    pub record_type: Option<RecordType>,
    #[serde(rename = "CreationTime", default)]
    pub creation_time: Option<String>,
    #[serde(rename = "Operation", default)]
    pub operation: Option<String>,
    #[serde(rename = "OrganizationId", default)]
    pub organization_id: Option<String>,
    #[serde(rename = "UserType", default)]
    pub user_type: Option<UserType>,
    #[serde(rename = "UserKey", default)]
    pub user_key: Option<String>,
    #[serde(rename = "Workload", default, skip_serializing_if = "Option::is_none")]
    pub workload: Option<String>,
    #[serde(rename = "ResultStatus", default, skip_serializing_if = "Option::is_none")]
    pub result_status: Option<String>,
    #[serde(rename = "ObjectId", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(rename = "UserId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "ClientIP", default)]
    pub client_ip: Option<String>,
    #[serde(rename = "Scope", default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<AuditLogScope>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
