//! Documents kept by the service.

pub mod account;
pub mod submission;
pub mod verse;

pub use account::{PoetProfile, Role, User};
pub use submission::{
    ArazStatus, Author, FeaturedSlot, InvalidRating, NotApproved, Rating, Submission,
    SubmissionMethod, SubmissionType,
};
pub use verse::{parse_day, DayOutOfRange, UnknownLanguage, Verse, VerseLanguage};
