//! Validation rule groups for each resource.
//!
//! Every variant gets its format rules in the `Default` group (they run on
//! every operation and pass vacuously when the field is absent) and its
//! mandatory-field rules in `Create`. Delete carries no field rules — the
//! payload is only audit context.
//!
//! Reference fields validate shape only; referential existence is the
//! repository's concern.

use cairn_core::{
  business::EntityType,
  message::MessageCode,
  validation::{Rule, RuleBook, RuleGroup, RuleKind},
};

/// Honorifics accepted for a person's `title` field.
const PERSON_TITLES: &[&str] = &["Mr", "Mrs", "Ms", "Mx", "Dr"];

/// Build the rule book for one variant.
pub fn rule_book(entity_type: EntityType) -> RuleBook {
  let mut book = RuleBook::new();
  match entity_type {
    EntityType::User => {
      book
        .add(
          RuleGroup::Default,
          Rule::new(
            "active",
            RuleKind::Boolean,
            MessageCode::ValidationInvalidBooleanValue,
          ),
        )
        .add(
          RuleGroup::Default,
          Rule::new(
            "securityGroupId",
            RuleKind::Integer,
            MessageCode::ValidationInvalidIntegerValue,
          ),
        )
        .add(
          RuleGroup::Default,
          Rule::new(
            "registeredDateTime",
            RuleKind::DateTime,
            MessageCode::ValidationInvalidDateTimeFormat,
          ),
        )
        .add(
          RuleGroup::Default,
          Rule::new(
            "timezoneCode",
            RuleKind::MaxLength(64),
            MessageCode::ValidationValueTooLong,
          ),
        )
        .add(
          RuleGroup::Default,
          Rule::new(
            "localeCode",
            RuleKind::MaxLength(16),
            MessageCode::ValidationValueTooLong,
          ),
        )
        .add(
          RuleGroup::Create,
          Rule::new(
            "username",
            RuleKind::Required,
            MessageCode::ValidationMandatoryFieldMissing,
          ),
        );
    }
    EntityType::Person => {
      book
        .add(
          RuleGroup::Default,
          Rule::new(
            "title",
            RuleKind::MemberOf(PERSON_TITLES),
            MessageCode::ValidationInvalidCodeValue,
          ),
        )
        .add(
          RuleGroup::Default,
          Rule::new(
            "userId",
            RuleKind::Uuid,
            MessageCode::ValidationInvalidReferenceValue,
          ),
        )
        .add(
          RuleGroup::Create,
          Rule::new(
            "firstName",
            RuleKind::Required,
            MessageCode::ValidationMandatoryFieldMissing,
          ),
        )
        .add(
          RuleGroup::Create,
          Rule::new(
            "lastName",
            RuleKind::Required,
            MessageCode::ValidationMandatoryFieldMissing,
          ),
        );
    }
    EntityType::Account => {
      book
        .add(
          RuleGroup::Default,
          Rule::new(
            "name",
            RuleKind::MaxLength(255),
            MessageCode::ValidationValueTooLong,
          ),
        )
        .add(
          RuleGroup::Default,
          Rule::new(
            "ownerId",
            RuleKind::Uuid,
            MessageCode::ValidationInvalidReferenceValue,
          ),
        )
        .add(
          RuleGroup::Create,
          Rule::new(
            "name",
            RuleKind::Required,
            MessageCode::ValidationMandatoryFieldMissing,
          ),
        );
    }
    EntityType::Tag => {
      book
        .add(
          RuleGroup::Default,
          Rule::new(
            "text",
            RuleKind::MaxLength(64),
            MessageCode::ValidationValueTooLong,
          ),
        )
        .add(
          RuleGroup::Create,
          Rule::new(
            "text",
            RuleKind::Required,
            MessageCode::ValidationMandatoryFieldMissing,
          ),
        );
    }
  }
  book
}
