//! Step executor: performs the concrete action for one step by delegating to
//! the delivery collaborators. Pure dispatch; the scheduler owns the ledger
//! write and the run transition that follow.

use anyhow::Result;
use std::sync::Arc;

use crate::domains::automations::{Run, RunStepStatus, Step};
use crate::kernel::{ContactSnapshot, EngineKernel};

/// Outcome of one step attempt, recorded verbatim in the ledger.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub status: RunStepStatus,
    pub message: String,
}

impl StepResult {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: RunStepStatus::Success,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            status: RunStepStatus::Failed,
            message: message.into(),
        }
    }
}

pub struct StepExecutor {
    kernel: Arc<EngineKernel>,
}

impl StepExecutor {
    pub fn new(kernel: Arc<EngineKernel>) -> Self {
        Self { kernel }
    }

    /// Execute one step against the contact.
    ///
    /// A delivery failure (provider rejection, missing recipient field) is a
    /// `failed` result, not an `Err`; `Err` is reserved for infrastructure
    /// problems that make the attempt itself unobservable.
    pub async fn execute(
        &self,
        run: &Run,
        step: &Step,
        contact: &ContactSnapshot,
    ) -> Result<StepResult> {
        match step {
            Step::SendSms { text } => {
                let Some(phone) = contact.phone.as_deref() else {
                    return Ok(StepResult::failed("contact has no phone number"));
                };

                let delivery = self
                    .kernel
                    .sms
                    .send_sms(run.workspace_id, run.contact_id, phone, text)
                    .await?;

                if delivery.success {
                    Ok(StepResult::success(match delivery.provider_ref {
                        Some(provider_ref) => format!("sms sent ({provider_ref})"),
                        None => "sms sent".to_string(),
                    }))
                } else {
                    Ok(StepResult::failed(
                        delivery
                            .error
                            .unwrap_or_else(|| "sms delivery failed".to_string()),
                    ))
                }
            }

            Step::SendEmail { subject, body } => {
                let Some(email) = contact.email.as_deref() else {
                    return Ok(StepResult::failed("contact has no email address"));
                };

                let delivery = self
                    .kernel
                    .email
                    .send_email(run.workspace_id, run.contact_id, email, subject, body)
                    .await?;

                if delivery.success {
                    Ok(StepResult::success(format!("email sent to {email}")))
                } else {
                    Ok(StepResult::failed(
                        delivery
                            .error
                            .unwrap_or_else(|| "email delivery failed".to_string()),
                    ))
                }
            }

            Step::CreateTask { text } => {
                let task_id = self
                    .kernel
                    .tasks
                    .create_task(run.workspace_id, run.contact_id, text)
                    .await?;
                Ok(StepResult::success(format!("created task {task_id}")))
            }

            // Waits are scheduled, never executed; the scheduler handles them
            // before reaching the executor
            Step::Wait { hours } => Ok(StepResult::success(format!("waited {hours}h"))),
        }
    }
}
