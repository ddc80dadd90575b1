use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Use together with `#[serde(default)]`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Error body returned by every failing endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Stable error kind (`validation`, `not_found`, ...).
    pub kind: String,
}

pub mod split_expense {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum SplitType {
        #[default]
        Equal,
        Percentage,
        Custom,
        Shares,
    }

    /// Per participant parameter: basis points for `PERCENTAGE`, minor units
    /// for `CUSTOM`, weight for `SHARES`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Portion {
        pub user_id: String,
        pub value: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SplitExpenseNew {
        pub group_id: String,
        pub expense_id: String,
        /// Minor units.
        pub total_amount: i64,
        #[serde(default)]
        pub split_type: SplitType,
        pub participants: Vec<String>,
        /// Required for every split type except `EQUAL`.
        #[serde(default)]
        pub custom_split_rules: Vec<Portion>,
        pub grace_end_date: Option<DateTime<Utc>>,
        pub due_date: DateTime<Utc>,
        #[serde(default)]
        pub needs_approval: bool,
        #[serde(default)]
        pub settlement_priority: i32,
        pub idempotency_key: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SplitExpenseUpdate {
        pub total_amount: Option<i64>,
        /// Must come with `customSplitRules` unless `EQUAL`.
        pub split_type: Option<SplitType>,
        pub custom_split_rules: Option<Vec<Portion>>,
        pub settlement_priority: Option<i32>,
        pub grace_end_date: Option<DateTime<Utc>>,
        pub due_date: Option<DateTime<Utc>>,
        pub needs_approval: Option<bool>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SplitExpense {
        pub id: Uuid,
        pub group_id: String,
        pub expense_id: String,
        pub created_by: String,
        pub total_amount: i64,
        pub split_type: SplitType,
        pub settlement_priority: i32,
        pub grace_end_date: DateTime<Utc>,
        pub custom_split_rules: Vec<Portion>,
        pub needs_approval: bool,
        pub due_date: DateTime<Utc>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub shares: Vec<super::share::Share>,
    }
}

pub mod share {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum ReminderFrequency {
        Daily,
        Weekly,
        Monthly,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum ShareState {
        Pending,
        Overdue,
        Settled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ShareNew {
        pub split_expense_id: Uuid,
        pub user_id: String,
        pub amount: i64,
        /// Basis points per day once overdue.
        #[serde(default)]
        pub interest_rate: i64,
        pub reminder_frequency: Option<ReminderFrequency>,
    }

    /// Field-level patch. Holders may only send `isPaid`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ShareUpdate {
        pub is_paid: Option<bool>,
        pub amount: Option<i64>,
        pub interest_rate: Option<i64>,
        /// `null` clears the reminder schedule.
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub reminder_frequency: Option<Option<ReminderFrequency>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentNew {
        /// When present, must cover the amount plus accrued interest.
        pub amount: Option<i64>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Share {
        pub id: Uuid,
        pub split_expense_id: Uuid,
        pub user_id: String,
        pub amount: i64,
        pub is_paid: bool,
        pub paid_at: Option<DateTime<Utc>>,
        pub interest_rate: i64,
        pub interest_accrued: i64,
        pub next_reminder_date: Option<DateTime<Utc>>,
        pub reminder_frequency: Option<ReminderFrequency>,
        /// Present on share endpoints, evaluated at request time.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub state: Option<ShareState>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct InterestAccrued {
        pub share_id: Uuid,
        pub interest_accrued: i64,
    }
}

#[cfg(test)]
mod tests {
    use super::share::{Share, ShareUpdate};

    #[test]
    fn share_update_tells_null_from_missing() {
        let missing: ShareUpdate = serde_json::from_str(r#"{"isPaid":true}"#).unwrap();
        assert_eq!(missing.reminder_frequency, None);

        let cleared: ShareUpdate = serde_json::from_str(r#"{"reminderFrequency":null}"#).unwrap();
        assert_eq!(cleared.reminder_frequency, Some(None));

        let set: ShareUpdate = serde_json::from_str(r#"{"reminderFrequency":"WEEKLY"}"#).unwrap();
        assert!(matches!(set.reminder_frequency, Some(Some(_))));
    }

    #[test]
    fn unset_dates_serialize_as_null() {
        let share = Share {
            id: uuid::Uuid::nil(),
            split_expense_id: uuid::Uuid::nil(),
            user_id: "bob".to_string(),
            amount: 100,
            is_paid: false,
            paid_at: None,
            interest_rate: 0,
            interest_accrued: 0,
            next_reminder_date: None,
            reminder_frequency: None,
            state: None,
        };
        let json = serde_json::to_value(&share).unwrap();
        assert!(json["paidAt"].is_null());
        assert!(json.as_object().unwrap().contains_key("paidAt"));
        assert!(json.as_object().unwrap().contains_key("nextReminderDate"));
        assert_eq!(json["splitExpenseId"], uuid::Uuid::nil().to_string());
    }
}
