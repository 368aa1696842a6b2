use crate::{
    core::item::{ItemProcessor, ItemProcessorResult},
    error::ValidationError,
};

use super::model::Person;

/// Uppercases the first and last name of a person.
///
/// Every other field passes through untouched. A person without a first or
/// last name is rejected rather than written half-transformed.
#[derive(Default, Debug, Clone, Copy)]
pub struct UpperCaseNameProcessor;

impl ItemProcessor<Person, Person> for UpperCaseNameProcessor {
    fn process(&self, person: Person) -> ItemProcessorResult<Person> {
        let first_name = person
            .first_name
            .as_deref()
            .ok_or_else(|| ValidationError::missing("firstName"))?
            .to_uppercase();
        let last_name = person
            .last_name
            .as_deref()
            .ok_or_else(|| ValidationError::missing("lastName"))?
            .to_uppercase();

        Ok(Person {
            first_name: Some(first_name),
            last_name: Some(last_name),
            ..person
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{core::item::ItemProcessor, error::ValidationError, person::model::Person};

    use super::UpperCaseNameProcessor;

    fn john_doe() -> Person {
        Person {
            user_id: Some("1".to_owned()),
            first_name: Some("John".to_owned()),
            last_name: Some("Doe".to_owned()),
            gender: Some("Male".to_owned()),
            email: Some("a@b.com".to_owned()),
            phone: Some("555-1".to_owned()),
            date_of_birth: Some("1990-01-01".to_owned()),
            job_title: Some("Eng".to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn uppercases_both_names_only() -> Result<(), ValidationError> {
        let person = UpperCaseNameProcessor.process(john_doe())?;

        assert_eq!(person.first_name.as_deref(), Some("JOHN"));
        assert_eq!(person.last_name.as_deref(), Some("DOE"));
        assert_eq!(person.email.as_deref(), Some("a@b.com"));
        assert_eq!(person.job_title.as_deref(), Some("Eng"));
        assert_eq!(person.id, None);
        Ok(())
    }

    #[test]
    fn is_idempotent() -> Result<(), ValidationError> {
        let once = UpperCaseNameProcessor.process(john_doe())?;
        let twice = UpperCaseNameProcessor.process(once.clone())?;

        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn handles_non_ascii_names() -> Result<(), ValidationError> {
        let person = Person {
            first_name: Some("Zoë".to_owned()),
            last_name: Some("straße".to_owned()),
            ..Default::default()
        };

        let person = UpperCaseNameProcessor.process(person)?;

        assert_eq!(person.first_name.as_deref(), Some("ZOË"));
        assert_eq!(person.last_name.as_deref(), Some("STRASSE"));
        Ok(())
    }

    #[test]
    fn keeps_empty_names_empty() -> Result<(), ValidationError> {
        let person = Person {
            first_name: Some(String::new()),
            last_name: Some(String::new()),
            ..Default::default()
        };

        let person = UpperCaseNameProcessor.process(person)?;

        assert_eq!(person.first_name.as_deref(), Some(""));
        Ok(())
    }

    #[test]
    fn rejects_a_missing_first_name() {
        let person = Person {
            first_name: None,
            ..john_doe()
        };

        let result = UpperCaseNameProcessor.process(person);

        assert_eq!(result, Err(ValidationError::missing("firstName")));
    }

    #[test]
    fn rejects_a_missing_last_name() {
        let person = Person {
            last_name: None,
            ..john_doe()
        };

        let result = UpperCaseNameProcessor.process(person);

        assert_eq!(result.unwrap_err().field, "lastName");
    }
}
