//! Structured business card fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The fourteen fields the extraction prompt asks for, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    CompanyName,
    FirstName,
    LastName,
    JobTitle,
    EmailAddress,
    CompleteAddress,
    Street,
    State,
    Country,
    PostalCode,
    FaxDetail,
    MobilePhone,
    Phone,
    WebsiteLink,
}

impl ContactField {
    pub const ALL: [ContactField; 14] = [
        ContactField::CompanyName,
        ContactField::FirstName,
        ContactField::LastName,
        ContactField::JobTitle,
        ContactField::EmailAddress,
        ContactField::CompleteAddress,
        ContactField::Street,
        ContactField::State,
        ContactField::Country,
        ContactField::PostalCode,
        ContactField::FaxDetail,
        ContactField::MobilePhone,
        ContactField::Phone,
        ContactField::WebsiteLink,
    ];

    /// JSON key used in the prompt and in model replies.
    pub fn key(&self) -> &'static str {
        match self {
            ContactField::CompanyName => "company_name",
            ContactField::FirstName => "first_name",
            ContactField::LastName => "last_name",
            ContactField::JobTitle => "job_title",
            ContactField::EmailAddress => "email_address",
            ContactField::CompleteAddress => "complete_address",
            ContactField::Street => "street",
            ContactField::State => "state",
            ContactField::Country => "country",
            ContactField::PostalCode => "postal_code",
            ContactField::FaxDetail => "fax_detail",
            ContactField::MobilePhone => "mobile_phone",
            ContactField::Phone => "phone",
            ContactField::WebsiteLink => "website_link",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContactField::CompanyName => "Company",
            ContactField::FirstName => "First Name",
            ContactField::LastName => "Last Name",
            ContactField::JobTitle => "Title",
            ContactField::EmailAddress => "Email",
            ContactField::CompleteAddress => "Address",
            ContactField::Street => "Street",
            ContactField::State => "State",
            ContactField::Country => "Country",
            ContactField::PostalCode => "Postal Code",
            ContactField::FaxDetail => "Fax",
            ContactField::MobilePhone => "Mobile Phone",
            ContactField::Phone => "Phone",
            ContactField::WebsiteLink => "Website",
        }
    }
}

/// A business card reduced to fixed string fields. Missing values are `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactRecord {
    pub company_name: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub email_address: String,
    pub complete_address: String,
    pub street: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub fax_detail: String,
    pub mobile_phone: String,
    pub phone: String,
    pub website_link: String,
}

impl ContactRecord {
    /// Reads the known fields out of a parsed JSON object. Unknown keys are
    /// ignored and non-string values are coerced to text.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut record = ContactRecord::default();
        for field in ContactField::ALL {
            if let Some(value) = object.get(field.key()) {
                *record.field_mut(field) = coerce_to_string(value);
            }
        }
        record
    }

    pub fn get(&self, field: ContactField) -> &str {
        match field {
            ContactField::CompanyName => &self.company_name,
            ContactField::FirstName => &self.first_name,
            ContactField::LastName => &self.last_name,
            ContactField::JobTitle => &self.job_title,
            ContactField::EmailAddress => &self.email_address,
            ContactField::CompleteAddress => &self.complete_address,
            ContactField::Street => &self.street,
            ContactField::State => &self.state,
            ContactField::Country => &self.country,
            ContactField::PostalCode => &self.postal_code,
            ContactField::FaxDetail => &self.fax_detail,
            ContactField::MobilePhone => &self.mobile_phone,
            ContactField::Phone => &self.phone,
            ContactField::WebsiteLink => &self.website_link,
        }
    }

    fn field_mut(&mut self, field: ContactField) -> &mut String {
        match field {
            ContactField::CompanyName => &mut self.company_name,
            ContactField::FirstName => &mut self.first_name,
            ContactField::LastName => &mut self.last_name,
            ContactField::JobTitle => &mut self.job_title,
            ContactField::EmailAddress => &mut self.email_address,
            ContactField::CompleteAddress => &mut self.complete_address,
            ContactField::Street => &mut self.street,
            ContactField::State => &mut self.state,
            ContactField::Country => &mut self.country,
            ContactField::PostalCode => &mut self.postal_code,
            ContactField::FaxDetail => &mut self.fax_detail,
            ContactField::MobilePhone => &mut self.mobile_phone,
            ContactField::Phone => &mut self.phone,
            ContactField::WebsiteLink => &mut self.website_link,
        }
    }

    /// Non-empty fields in display order. Values are not trimmed.
    pub fn present_fields(&self) -> impl Iterator<Item = (ContactField, &str)> {
        ContactField::ALL
            .into_iter()
            .map(move |field| (field, self.get(field)))
            .filter(|(_, value)| !value.is_empty())
    }

    /// One `Label: value` line per non-empty field.
    pub fn render(&self) -> String {
        self.present_fields()
            .map(|(field, value)| format!("{}: {}", field.label(), value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
