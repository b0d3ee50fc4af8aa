use crate::error::FieldErrors;
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedOption {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub label: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionWrite {
    pub id: Option<Uuid>,
    pub label: String,
    pub value: String,
    pub order: i32,
}

/// Writes needed to turn a question's stored options into the submitted list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OptionPlan {
    pub delete: Vec<Uuid>,
    pub update: Vec<OptionWrite>,
    pub create: Vec<OptionWrite>,
}

/// Options are written in submission order; `value` falls back to `label`.
pub fn option_writes(submitted: &[SubmittedOption]) -> Result<Vec<OptionWrite>, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut writes = Vec::with_capacity(submitted.len());
    for (idx, opt) in submitted.iter().enumerate() {
        let label = opt.label.trim();
        if label.is_empty() {
            errors.add(format!("options.{idx}.label"), "The option label field is required.");
            continue;
        }
        let value = opt
            .value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(label);
        writes.push(OptionWrite {
            id: opt.id,
            label: label.to_string(),
            value: value.to_string(),
            order: idx as i32,
        });
    }
    if errors.is_empty() {
        Ok(writes)
    } else {
        Err(errors)
    }
}

/// Submitted options without an id are created, stored ids missing from the
/// submission are deleted, the rest are updated in place.
pub fn plan_options(existing: &[Uuid], submitted: &[SubmittedOption]) -> Result<OptionPlan, FieldErrors> {
    let writes = option_writes(submitted)?;

    let known: HashSet<Uuid> = existing.iter().copied().collect();
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut errors = FieldErrors::new();
    let mut plan = OptionPlan::default();

    for (idx, write) in writes.into_iter().enumerate() {
        match write.id {
            Some(id) if !known.contains(&id) => {
                errors.add(format!("options.{idx}.id"), format!("The selected options.{idx}.id is invalid."));
            }
            Some(id) if !seen.insert(id) => {
                errors.add(format!("options.{idx}.id"), "This option was submitted twice.");
            }
            Some(_) => plan.update.push(write),
            None => plan.create.push(write),
        }
    }

    plan.delete = existing.iter().copied().filter(|id| !seen.contains(id)).collect();

    if errors.is_empty() {
        Ok(plan)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(id: Option<Uuid>, label: &str, value: Option<&str>) -> SubmittedOption {
        SubmittedOption {
            id,
            label: label.to_string(),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn splits_into_create_update_delete() {
        let keep = Uuid::new_v4();
        let drop = Uuid::new_v4();
        let submitted = vec![opt(None, "Baru", None), opt(Some(keep), "Lama", Some("l"))];

        let plan = plan_options(&[keep, drop], &submitted).unwrap();

        assert_eq!(plan.delete, vec![drop]);
        assert_eq!(plan.update.len(), 1);
        assert_eq!(plan.update[0].id, Some(keep));
        assert_eq!(plan.update[0].order, 1);
        assert_eq!(plan.update[0].value, "l");
        assert_eq!(plan.create.len(), 1);
        assert_eq!(plan.create[0].value, "Baru");
        assert_eq!(plan.create[0].order, 0);
    }

    #[test]
    fn empty_submission_deletes_everything() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let plan = plan_options(&[a, b], &[]).unwrap();
        assert_eq!(plan.delete, vec![a, b]);
        assert!(plan.update.is_empty() && plan.create.is_empty());
    }

    #[test]
    fn rejects_ids_of_other_questions() {
        let foreign = Uuid::new_v4();
        let errors = plan_options(&[], &[opt(Some(foreign), "X", None)]).unwrap_err();
        assert!(errors.contains("options.0.id"));
    }

    #[test]
    fn rejects_duplicate_ids_and_blank_labels() {
        let id = Uuid::new_v4();
        let errors = plan_options(&[id], &[opt(Some(id), "A", None), opt(Some(id), "B", None)]).unwrap_err();
        assert!(errors.contains("options.1.id"));

        let errors = option_writes(&[opt(None, "  ", None)]).unwrap_err();
        assert!(errors.contains("options.0.label"));
    }
}
