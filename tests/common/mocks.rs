//! Mock version of a person writer
use mockall::mock;

use person_batch::{
    core::item::{ItemWriter, ItemWriterResult},
    person::Person,
};

mock! {
    pub PersonWriter {}
    impl ItemWriter<Person> for PersonWriter {
        fn write(&self, items: &[Person]) -> ItemWriterResult;
    }
}
