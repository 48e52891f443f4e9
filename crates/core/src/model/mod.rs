mod ids;
mod question;
mod result;
mod test_definition;

pub use ids::{AnswerId, ParseIdError, QuestionId, ResultId, TestId};

pub use question::{Answer, NewAnswer, NewQuestion, Question, QuestionError};
pub use result::{ResultDraft, ResultError, TestResult};
pub use test_definition::{TestDefinition, TestDefinitionError, TestDraft, TestSettings};
