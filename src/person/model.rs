use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, query_builder::Separated};

use crate::{
    error::BatchError,
    item::{
        csv::line_tokenizer::{FieldSet, FieldSetMapper},
        rdbc::DatabaseItemBinder,
    },
};

/// Field names of an input line, in column order.
pub const FIELD_NAMES: [&str; 8] = [
    "userId",
    "firstName",
    "lastName",
    "gender",
    "email",
    "phone",
    "dateOfBirth",
    "jobTitle",
];

/// Columns of the `person` table written by `PersonBinder`, in bind order.
pub const PERSON_COLUMNS: [&str; 8] = [
    "user_id",
    "first_name",
    "last_name",
    "gender",
    "email",
    "phone",
    "date_of_birth",
    "job_title",
];

/// One person row.
///
/// Text fields are `None` when the line mapping did not provide them, and
/// `Some("")` for an empty token. `id` is assigned by the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: Option<i64>,
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub job_title: Option<String>,
}

/// Binds a `FieldSet` onto a `Person` by field name, ignoring case.
#[derive(Default, Debug, Clone, Copy)]
pub struct PersonFieldSetMapper;

impl FieldSetMapper<Person> for PersonFieldSetMapper {
    fn map_field_set(&self, field_set: &FieldSet) -> Result<Person, BatchError> {
        let field = |name: &str| field_set.get(name).map(str::to_owned);

        Ok(Person {
            id: None,
            user_id: field("userId"),
            first_name: field("firstName"),
            last_name: field("lastName"),
            gender: field("gender"),
            email: field("email"),
            phone: field("phone"),
            date_of_birth: field("dateOfBirth"),
            job_title: field("jobTitle"),
        })
    }
}

/// Binds the `PERSON_COLUMNS` of a person; the identity is left to the
/// database.
#[derive(Default, Debug, Clone, Copy)]
pub struct PersonBinder;

impl DatabaseItemBinder<Person, Sqlite> for PersonBinder {
    fn bind(&self, item: &Person, mut query_builder: Separated<Sqlite, &str>) {
        query_builder.push_bind(item.user_id.clone());
        query_builder.push_bind(item.first_name.clone());
        query_builder.push_bind(item.last_name.clone());
        query_builder.push_bind(item.gender.clone());
        query_builder.push_bind(item.email.clone());
        query_builder.push_bind(item.phone.clone());
        query_builder.push_bind(item.date_of_birth.clone());
        query_builder.push_bind(item.job_title.clone());
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::BatchError,
        item::csv::line_tokenizer::{DelimitedLineTokenizer, FieldSetMapper},
    };

    use super::{FIELD_NAMES, PersonFieldSetMapper};

    #[test]
    fn maps_every_field_of_a_line() -> Result<(), BatchError> {
        let tokenizer = DelimitedLineTokenizer::new(FIELD_NAMES);
        let field_set = tokenizer.tokenize("1,John,Doe,Male,a@b.com,555-1,1990-01-01,Eng")?;

        let person = PersonFieldSetMapper.map_field_set(&field_set)?;

        assert_eq!(person.id, None);
        assert_eq!(person.user_id.as_deref(), Some("1"));
        assert_eq!(person.first_name.as_deref(), Some("John"));
        assert_eq!(person.last_name.as_deref(), Some("Doe"));
        assert_eq!(person.gender.as_deref(), Some("Male"));
        assert_eq!(person.email.as_deref(), Some("a@b.com"));
        assert_eq!(person.phone.as_deref(), Some("555-1"));
        assert_eq!(person.date_of_birth.as_deref(), Some("1990-01-01"));
        assert_eq!(person.job_title.as_deref(), Some("Eng"));
        Ok(())
    }

    #[test]
    fn leaves_unnamed_fields_empty() -> Result<(), BatchError> {
        let tokenizer = DelimitedLineTokenizer::new(["USERID", "lastname"]);
        let field_set = tokenizer.tokenize("42,Hopper")?;

        let person = PersonFieldSetMapper.map_field_set(&field_set)?;

        assert_eq!(person.user_id.as_deref(), Some("42"));
        assert_eq!(person.last_name.as_deref(), Some("Hopper"));
        assert_eq!(person.first_name, None);
        assert_eq!(person.job_title, None);
        Ok(())
    }

    #[test]
    fn serializes_with_camel_case_names() {
        let person = super::Person {
            id: Some(3),
            first_name: Some("ADA".to_owned()),
            ..Default::default()
        };

        let json = serde_json::to_value(&person).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["firstName"], "ADA");
        assert!(json["dateOfBirth"].is_null());
    }
}
