//! Public write paths: contact submissions and newsletter subscriptions.
//!
//! Both endpoints are gated by the fixed-window rate limiter before any
//! validation or persistence happens. A denied request is a normal outcome,
//! not an error, and carries the retry delay for the response.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::{ContactSubmissionRecord, SubscriberRecord};
use crate::domain::error::DomainError;
use crate::rate_limit::{RateBudget, RateDecision, RateLimiter};

use super::error::AppError;
use super::repos::{ContactRepo, NewContactSubmission, RepoError, SubscribersRepo};

const CONTACT_ACTION: &str = "contact";
const SUBSCRIBE_ACTION: &str = "subscribe";

const MAX_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_SUBJECT_LENGTH: usize = 200;
const MAX_MESSAGE_LENGTH: usize = 5000;

/// Outcome of a contact submission attempt.
#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted(Box<ContactSubmissionRecord>),
    RateLimited { retry_after: Duration },
}

/// Outcome of a newsletter subscription attempt.
#[derive(Debug)]
pub enum SubscribeOutcome {
    Subscribed(Box<SubscriberRecord>),
    AlreadySubscribed,
    RateLimited { retry_after: Duration },
}

pub struct ContactService {
    contact: Arc<dyn ContactRepo>,
    subscribers: Arc<dyn SubscribersRepo>,
    limiter: RateLimiter,
    contact_budget: RateBudget,
    subscribe_budget: RateBudget,
}

impl ContactService {
    pub fn new(
        contact: Arc<dyn ContactRepo>,
        subscribers: Arc<dyn SubscribersRepo>,
        limiter: RateLimiter,
        contact_budget: RateBudget,
        subscribe_budget: RateBudget,
    ) -> Self {
        Self {
            contact,
            subscribers,
            limiter,
            contact_budget,
            subscribe_budget,
        }
    }

    /// Gate on the caller's contact budget, then validate and persist.
    pub async fn submit(
        &self,
        identity: &str,
        submission: NewContactSubmission,
    ) -> Result<SubmitOutcome, AppError> {
        // The quota check precedes everything, including validation: denied
        // requests must not touch the data store.
        if let RateDecision::Denied { retry_after } = self
            .limiter
            .allow(identity, CONTACT_ACTION, self.contact_budget)
            .await
        {
            return Ok(SubmitOutcome::RateLimited { retry_after });
        }

        validate_submission(&submission)?;
        let record = self.contact.insert_submission(submission).await?;
        Ok(SubmitOutcome::Accepted(Box::new(record)))
    }

    /// Gate on the caller's subscribe budget, then validate and persist.
    ///
    /// A duplicate email is a distinct outcome, not an error.
    pub async fn subscribe(
        &self,
        identity: &str,
        email: &str,
    ) -> Result<SubscribeOutcome, AppError> {
        if let RateDecision::Denied { retry_after } = self
            .limiter
            .allow(identity, SUBSCRIBE_ACTION, self.subscribe_budget)
            .await
        {
            return Ok(SubscribeOutcome::RateLimited { retry_after });
        }

        validate_email(email)?;
        match self.subscribers.insert_subscriber(email).await {
            Ok(record) => Ok(SubscribeOutcome::Subscribed(Box::new(record))),
            Err(RepoError::Duplicate { .. }) => Ok(SubscribeOutcome::AlreadySubscribed),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn list_submissions(
        &self,
        limit: u32,
    ) -> Result<Vec<ContactSubmissionRecord>, AppError> {
        Ok(self.contact.list_submissions(limit).await?)
    }
}

fn validate_submission(submission: &NewContactSubmission) -> Result<(), AppError> {
    if submission.name.trim().is_empty() || submission.name.len() > MAX_NAME_LENGTH {
        return Err(DomainError::validation("name must be 1-100 characters").into());
    }
    validate_email(&submission.email)?;
    if submission.subject.len() > MAX_SUBJECT_LENGTH {
        return Err(DomainError::validation("subject exceeds 200 characters").into());
    }
    if submission.message.trim().is_empty() || submission.message.len() > MAX_MESSAGE_LENGTH {
        return Err(DomainError::validation("message must be 1-5000 characters").into());
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = email.len() <= MAX_EMAIL_LENGTH
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });
    if !valid {
        return Err(DomainError::validation("email address is not valid").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::rate_limit::MemoryRateStore;

    use super::*;

    #[derive(Default)]
    struct FakeContactRepo {
        submissions: Mutex<Vec<ContactSubmissionRecord>>,
    }

    #[async_trait]
    impl ContactRepo for FakeContactRepo {
        async fn insert_submission(
            &self,
            submission: NewContactSubmission,
        ) -> Result<ContactSubmissionRecord, RepoError> {
            let record = ContactSubmissionRecord {
                id: Uuid::new_v4(),
                name: submission.name,
                email: submission.email,
                subject: submission.subject,
                message: submission.message,
                client_ip: submission.client_ip,
                submitted_at: OffsetDateTime::now_utc(),
            };
            self.submissions.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn list_submissions(
            &self,
            _limit: u32,
        ) -> Result<Vec<ContactSubmissionRecord>, RepoError> {
            Ok(self.submissions.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct FakeSubscribersRepo {
        emails: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SubscribersRepo for FakeSubscribersRepo {
        async fn insert_subscriber(&self, email: &str) -> Result<SubscriberRecord, RepoError> {
            let mut emails = self.emails.lock().unwrap();
            if emails.iter().any(|existing| existing == email) {
                return Err(RepoError::Duplicate {
                    constraint: "subscribers_email_key".to_string(),
                });
            }
            emails.push(email.to_string());
            Ok(SubscriberRecord {
                id: Uuid::new_v4(),
                email: email.to_string(),
                subscribed_at: OffsetDateTime::now_utc(),
            })
        }
    }

    fn service(contact_limit: u32, subscribe_limit: u32) -> ContactService {
        let window = Duration::from_secs(60);
        ContactService::new(
            Arc::new(FakeContactRepo::default()),
            Arc::new(FakeSubscribersRepo::default()),
            RateLimiter::new(Arc::new(MemoryRateStore::new())),
            RateBudget::new(contact_limit, window),
            RateBudget::new(subscribe_limit, window),
        )
    }

    fn submission() -> NewContactSubmission {
        NewContactSubmission {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            subject: "Hello".to_string(),
            message: "I would like to talk about a project.".to_string(),
            client_ip: Some("203.0.113.7".to_string()),
        }
    }

    #[tokio::test]
    async fn quota_exhaustion_is_an_outcome_not_an_error() {
        let service = service(2, 2);

        for _ in 0..2 {
            let outcome = service.submit("203.0.113.7", submission()).await.unwrap();
            assert!(matches!(outcome, SubmitOutcome::Accepted(_)));
        }

        let outcome = service.submit("203.0.113.7", submission()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::RateLimited { .. }));
    }

    #[tokio::test]
    async fn denied_submission_is_not_persisted() {
        let service = service(1, 1);

        service.submit("203.0.113.7", submission()).await.unwrap();
        service.submit("203.0.113.7", submission()).await.unwrap();

        assert_eq!(service.list_submissions(50).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_email_is_a_validation_error() {
        let service = service(5, 5);
        let mut bad = submission();
        bad.email = "not-an-email".to_string();

        let err = service.submit("203.0.113.7", bad).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn contact_and_subscribe_budgets_are_independent() {
        let service = service(1, 1);

        service.submit("203.0.113.7", submission()).await.unwrap();

        // contact budget spent; subscribe still has its own slot
        let outcome = service
            .subscribe("203.0.113.7", "ada@example.com")
            .await
            .unwrap();
        assert!(matches!(outcome, SubscribeOutcome::Subscribed(_)));
    }

    #[tokio::test]
    async fn duplicate_subscription_is_reported_as_such() {
        let service = service(5, 5);

        service
            .subscribe("203.0.113.7", "ada@example.com")
            .await
            .unwrap();
        let outcome = service
            .subscribe("203.0.113.7", "ada@example.com")
            .await
            .unwrap();

        assert!(matches!(outcome, SubscribeOutcome::AlreadySubscribed));
    }
}
