mod exam;
mod ids;
mod question;
mod review;

pub use exam::{Exam, ExamError, ExamSettings, ExamType};
pub use ids::{ExamId, ParseIdError, QuestionId, ReviewId};
pub use question::{
    AnswerOption, Difficulty, MAX_OPTIONS, OptionLetter, Question, QuestionDraft, QuestionError,
    ValidatedQuestion,
};
pub use review::{Review, ReviewDraft, ReviewError, ValidatedReview};
