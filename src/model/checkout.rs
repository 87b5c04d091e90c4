use serde::{Deserialize, Serialize};

use super::catalog::{Client, Group};
use crate::error::{FieldError, MwanamamaError};

/// Who is buying. Group purchases go on the group's credit line; individual
/// purchases are paid by M-Pesa at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuyerKind {
    Group,
    #[default]
    Individual,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutFormData {
    pub buyer_kind: BuyerKind,
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub branch_id: Option<i64>,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub client_id: Option<i64>,
    #[serde(default)]
    pub credit_officer: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutFormData {
    pub fn new(buyer_kind: BuyerKind) -> Self {
        Self {
            buyer_kind,
            ..Self::default()
        }
    }

    /// Fill the group fields from a selected group record.
    pub fn prefill_from_group(&mut self, group: &Group) {
        self.buyer_kind = BuyerKind::Group;
        self.group_id = Some(group.id);
        self.group_name = Some(group.group_name.clone());
        if let Some(branch) = &group.branch {
            self.branch_id = Some(branch.id);
            self.branch_name = Some(branch.name.clone());
        }
        if let Some(officer) = &group.credit_officer {
            self.credit_officer = Some(officer.clone());
        }
        if self.address.is_empty() {
            if let Some(location) = &group.location {
                self.address = location.clone();
            }
        }
    }

    /// Fill buyer fields from a client record, pulling in the client's group.
    pub fn prefill_from_client(&mut self, client: &Client) {
        self.client_id = Some(client.id);
        self.full_name = client.full_name.clone();
        if let Some(phone) = &client.phone {
            self.phone = phone.clone();
        }
        if let Some(address) = &client.address {
            self.address = address.clone();
        }
        if let Some(branch) = &client.branch {
            self.branch_id = Some(branch.id);
            self.branch_name = Some(branch.name.clone());
        }
        if let Some(group) = &client.group {
            let kind = self.buyer_kind;
            self.prefill_from_group(group);
            self.buyer_kind = kind;
        }
    }

    /// Check required fields for the buyer kind. Reports every problem at once.
    pub fn validate(&self) -> Result<(), MwanamamaError> {
        let mut errors = Vec::new();

        match self.buyer_kind {
            BuyerKind::Group => {
                if self.group_id.is_none() {
                    errors.push(FieldError::required("group"));
                }
                if self.branch_id.is_none() {
                    errors.push(FieldError::required("branch"));
                }
                if is_blank(self.credit_officer.as_deref()) {
                    errors.push(FieldError::required("creditOfficer"));
                }
            }
            BuyerKind::Individual => {
                if self.full_name.trim().is_empty() {
                    errors.push(FieldError::required("fullName"));
                }
                if self.phone.trim().is_empty() {
                    errors.push(FieldError::required("phone"));
                } else if let Err(e) = normalize_msisdn(&self.phone) {
                    errors.push(e);
                }
                if self.address.trim().is_empty() {
                    errors.push(FieldError::required("address"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MwanamamaError::Validation(errors))
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Normalize a Kenyan mobile number to the `2547XXXXXXXX` / `2541XXXXXXXX`
/// form the STK push endpoint expects.
///
/// Accepts `07…`, `01…`, `7…`, `1…`, `2547…` and `+2547…`, ignoring spaces
/// and dashes.
pub fn normalize_msisdn(phone: &str) -> Result<String, FieldError> {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = digits.strip_prefix('+').unwrap_or(&digits);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldError::invalid("phone", "must contain only digits"));
    }

    let subscriber = if let Some(rest) = digits.strip_prefix("254") {
        rest
    } else if let Some(rest) = digits.strip_prefix('0') {
        rest
    } else {
        digits
    };

    if subscriber.len() != 9 || !(subscriber.starts_with('7') || subscriber.starts_with('1')) {
        return Err(FieldError::invalid(
            "phone",
            "must be a Safaricom number like 0712345678",
        ));
    }

    Ok(format!("254{subscriber}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::Branch;

    #[test]
    fn test_normalize_msisdn_forms() {
        for input in ["0712345678", "712345678", "254712345678", "+254712345678", "0712 345-678"] {
            assert_eq!(normalize_msisdn(input).unwrap(), "254712345678", "{input}");
        }
        assert_eq!(normalize_msisdn("0110000000").unwrap(), "254110000000");
        assert_eq!(normalize_msisdn("+254700000000").unwrap(), "254700000000");
    }

    #[test]
    fn test_normalize_msisdn_rejects() {
        assert!(normalize_msisdn("").is_err());
        assert!(normalize_msisdn("07123").is_err());
        assert!(normalize_msisdn("0812345678").is_err());
        assert!(normalize_msisdn("07abc45678").is_err());
    }

    #[test]
    fn test_individual_validation_lists_all_missing() {
        let form = CheckoutFormData::new(BuyerKind::Individual);
        let Err(MwanamamaError::Validation(errors)) = form.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["fullName", "phone", "address"]);
    }

    #[test]
    fn test_individual_validation_passes() {
        let form = CheckoutFormData {
            full_name: "Wanjiru Kamau".into(),
            phone: "0712345678".into(),
            address: "Kenyatta Ave, Nakuru".into(),
            ..CheckoutFormData::new(BuyerKind::Individual)
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_group_prefill_satisfies_validation() {
        let group = Group {
            id: 11,
            group_name: "Tumaini Women".into(),
            branch: Some(Branch {
                id: 3,
                name: "Thika".into(),
            }),
            credit_officer: Some("J. Otieno".into()),
            location: Some("Makongeni".into()),
        };
        let mut form = CheckoutFormData::new(BuyerKind::Group);
        assert!(form.validate().is_err());

        form.prefill_from_group(&group);
        assert!(form.validate().is_ok());
        assert_eq!(form.branch_name.as_deref(), Some("Thika"));
        assert_eq!(form.address, "Makongeni");
    }

    #[test]
    fn test_client_prefill_keeps_buyer_kind() {
        let client = Client {
            id: 42,
            full_name: "Achieng Odhiambo".into(),
            phone: Some("0722000111".into()),
            address: Some("Kisumu".into()),
            group: Some(Group {
                id: 5,
                group_name: "Upendo".into(),
                branch: None,
                credit_officer: None,
                location: None,
            }),
            branch: None,
        };
        let mut form = CheckoutFormData::new(BuyerKind::Individual);
        form.prefill_from_client(&client);

        assert_eq!(form.buyer_kind, BuyerKind::Individual);
        assert_eq!(form.client_id, Some(42));
        assert_eq!(form.group_id, Some(5));
        assert!(form.validate().is_ok());
    }
}
