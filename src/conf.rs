// Configuration reads: libraries, departments and code tables
use crate::client::{AlmaClient, ApiRequest};
use crate::dispatch;
use crate::error::{BulkOutcome, Result};
use crate::model::{CodeTable, Departments, Libraries};
use tokio_util::sync::CancellationToken;

const CONF_PATH: &str = "/almaws/v1/conf";

/// Code tables known to exist in every institution.
pub const CODE_TABLE_NAMES: &[&str] = &[
    "accessionPlacementsOptions",
    "AcqItemSourceType",
    "AcquisitionMethod",
    "ActiveResourcesTypes",
    "AddNewUserOptions",
    "AdminURIType",
    "ARTEmailDeliveryKeywords",
    "ARTEmailQueriesKeywords",
    "ARTEmailServiceKeywords",
    "AssertionCodes",
    "BaseStatus",
    "BLDSSDigitalFormats",
    "BooleanYesNo",
    "CalendarRecordStatuses",
    "CalendarRecordsTypes",
    "CallNumberType",
    "CampusListSearchableColumns",
    "CatalogerLevel",
    "CitationAttributes",
    "CitationAttributesTypes",
    "CitationCopyRights",
    "CollectionAccessType",
    "ContentStructureStatus",
    "CounterPlatform",
    "CountryCodes",
    "CourseTerms",
    "CoverageInUse",
    "crossRefEnabled",
    "CrossRefSupported",
    "Currency_CT",
    "DaysOfWeek",
    "DigitalRepresentationBaseStatus",
    "EDINamingConvention",
    "EdiPreference",
    "EdiType",
    "ElectronicBaseStatus",
    "electronicMaterialType",
    "ElectronicPortfolioBaseStatus",
    "ExpiryType",
    "ExternalSystemTypes",
    "FineFeeTransactionType",
    "FTPMode",
    "FTPSend",
    "FundType",
    "Genders",
    "GroupProxyEnabled",
    "HFrUserFinesFees.fineFeeStatus",
    "HFrUserFinesFees.fineFeeType",
    "HFrUserRoles.roleType",
    "HfundLedger.status",
    "HFundsTransactionItem.reportingCode",
    "HItemLoan.processStatus",
    "HLicense.status",
    "HLicense.type",
    "HLocation.locationType",
    "HPaTaskChain.businessEntity",
    "HPaTaskChain.type",
    "ImplementedAuthMethod",
    "IntegrationTypes",
    "InvoiceApprovalStatus",
    "InvoiceCreationForm",
    "InvoiceLineStatus",
    "InvoiceLinesTypes",
    "InvoiceStatus",
    "IpAddressRegMethod",
    "isAggregator",
    "IsFree",
    "ItemPhysicalCondition",
    "ItemPolicy",
    "JobsApiJobTypes",
    "jobScheduleNames",
    "JobTitles",
    "LevelOfService",
    "LibraryNoticesOptInDisplay",
    "LicenseReviewStatuses",
    "LicenseStorageLocation",
    "LicenseTerms",
    "LicenseTermsAndTypes",
    "LinkingLevel",
    "LinkResolverPlugin",
    "marcLanguage",
    "Months",
    "MovingWallOperator",
    "NoteTypes",
    "OwnerHierarchy",
    "PartnerSystemTypes",
    "PaymentMethod",
    "PaymentStatus",
    "PhysicalMaterialType",
    "PhysicalReadingListCitationTypes",
    "POLineStatus",
    "PortfolioAccessType",
    "PPRSourceType",
    "PR_CitationType",
    "PR_RejectReasons",
    "PR_RequestedFormat",
    "PROCESSTYPE",
    "provenanceCodes",
    "PurchaseRequestStatus",
    "PurchaseType",
    "ReadingListCitationSecondaryTypes",
    "ReadingListCitationTypes",
    "ReadingListRLStatuses",
    "ReadingListStatuses",
    "ReadingListVisibilityStatuses",
    "RecurrenceType",
    "ReminderStatuses",
    "ReminderTypes",
    "RenewalCycle",
    "representationEntityType",
    "RepresentationUsageType",
    "RequestFormats",
    "RequestOptions",
    "ResourceSharingCopyrightsStatus",
    "ResourceSharingLanguages",
    "ResourceSharingRequestSendMethod",
    "SecondReportingCode",
    "ServiceType",
    "SetContentType",
    "SetPrivacy",
    "SetStatus",
    "SetType",
    "ShippingMethod",
    "Sub Systems",
    "SystemJobReportAlertMessage",
    "systemJobStatus",
    "TagTypes",
    "ThirdReportingCode",
    "UsageStatsDeliveryMethod",
    "UsageStatsFormat",
    "UsageStatsFrequency",
    "UserAddressTypes",
    "UserBlockDescription",
    "UserBlockTypes",
    "UserEmailTypes",
    "UserGroups",
    "UserIdentifierTypes",
    "UserPhoneTypes",
    "UserPreferredLanguage",
    "UserRoleStatus",
    "UserStatCategories",
    "UserStatisticalTypes",
    "UserUserType",
    "UserWebAddressTypes",
    "VATType",
    "VendorReferenceNumberType",
    "VendorSearchStatusFilter",
    "WebhookEvents",
    "WebhooksActionType",
    "WorkbenchPaymentMethod",
];

impl AlmaClient {
    pub async fn libraries(&self, cancel: &CancellationToken) -> Result<Libraries> {
        self.fetch(
            cancel,
            "libraries",
            ApiRequest::get(format!("{}/libraries", CONF_PATH)),
        )
        .await
    }

    pub async fn departments(&self, cancel: &CancellationToken) -> Result<Departments> {
        self.fetch(
            cancel,
            "departments",
            ApiRequest::get(format!("{}/departments", CONF_PATH)),
        )
        .await
    }

    pub async fn code_table(&self, cancel: &CancellationToken, name: &str) -> Result<CodeTable> {
        let request = ApiRequest::get(format!("{}/code-tables/{}", CONF_PATH, name));
        self.fetch(cancel, "code table", request).await
    }

    /// Fetch the given code tables concurrently.
    pub async fn code_tables_named(
        &self,
        cancel: &CancellationToken,
        names: &[&str],
    ) -> BulkOutcome<CodeTable> {
        dispatch::for_each(
            cancel,
            self.config().workers,
            "Getting code tables",
            self.progress(),
            names.iter().map(|name| name.to_string()),
            |name, token| {
                let client = self.clone();
                async move { client.code_table(&token, &name).await }
            },
        )
        .await
    }

    /// Fetch every table in [`CODE_TABLE_NAMES`].
    pub async fn code_tables(&self, cancel: &CancellationToken) -> BulkOutcome<CodeTable> {
        self.code_tables_named(cancel, CODE_TABLE_NAMES).await
    }
}
