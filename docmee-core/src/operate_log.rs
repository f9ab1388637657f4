//! Operation-log lookup boundary.
//!
//! The admin side of the application shows the operation history of a CRM
//! entity next to its generated presentations. The history itself lives in a
//! separate logging service; this module only fixes the contract: which log
//! category a business type maps to, and the query shape sent to
//! [`OperateLogApi`].

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{ClientError, ClientResult};

/// Page size that asks the logging service for every record at once.
pub const PAGE_SIZE_NONE: i32 = -1;

/// Business types that carry an operation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BizType {
    Leads,
    Customer,
    Contact,
    Business,
    Contract,
    Product,
    Receivable,
    ReceivablePlan,
}

impl BizType {
    pub const ALL: [BizType; 8] = [
        BizType::Leads,
        BizType::Customer,
        BizType::Contact,
        BizType::Business,
        BizType::Contract,
        BizType::Product,
        BizType::Receivable,
        BizType::ReceivablePlan,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub const fn code(self) -> i32 {
        match self {
            BizType::Leads => 1,
            BizType::Customer => 2,
            BizType::Contact => 3,
            BizType::Business => 4,
            BizType::Contract => 5,
            BizType::Product => 6,
            BizType::Receivable => 7,
            BizType::ReceivablePlan => 8,
        }
    }

    /// Category under which the logging service files records of this type.
    pub const fn log_category(self) -> &'static str {
        match self {
            BizType::Leads => "CRM 线索",
            BizType::Customer => "CRM 客户",
            BizType::Contact => "CRM 联系人",
            BizType::Business => "CRM 商机",
            BizType::Contract => "CRM 合同",
            BizType::Product => "CRM 产品",
            BizType::Receivable => "CRM 回款",
            BizType::ReceivablePlan => "CRM 回款计划",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperateLogQuery {
    pub biz_type: String,
    pub biz_id: i64,
    pub page_no: i32,
    pub page_size: i32,
}

impl OperateLogQuery {
    /// Query for the full log of one entity.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidInput`] for an unknown business type code.
    pub fn for_entity(biz_type_code: i32, biz_id: i64) -> ClientResult<Self> {
        let biz_type = BizType::from_code(biz_type_code).ok_or_else(|| {
            error!(biz_type_code, "Unknown business type for operation log");
            ClientError::invalid_input(format!("unknown business type code {biz_type_code}"))
        })?;
        Ok(Self {
            biz_type: biz_type.log_category().to_string(),
            biz_id,
            page_no: 1,
            page_size: PAGE_SIZE_NONE,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperateLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub biz_type: Option<String>,
    pub biz_id: i64,
    pub action: Option<String>,
    pub extra: Option<String>,
    #[serde(with = "crate::model::timestamp")]
    pub create_time: Option<chrono::NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperateLogPage {
    pub list: Vec<OperateLogEntry>,
    pub total: i64,
}

/// The logging service, as seen from this application.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait OperateLogApi: Send + Sync {
    async fn operate_log_page(&self, query: OperateLogQuery) -> ClientResult<OperateLogPage>;
}

/// Every operation-log record of one entity.
pub async fn entity_operate_logs<A>(
    api: &A,
    biz_type_code: i32,
    biz_id: i64,
) -> ClientResult<OperateLogPage>
where
    A: OperateLogApi + ?Sized,
{
    let query = OperateLogQuery::for_entity(biz_type_code, biz_id)?;
    let page = api.operate_log_page(query).await?;
    info!(biz_type_code, biz_id, records = page.list.len(), "Fetched operation log");
    Ok(page)
}
