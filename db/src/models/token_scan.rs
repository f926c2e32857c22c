use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One accepted scan. At most one per token, member and kind.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "token_scans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub token_id: i64,
    pub member_id: i64,
    pub kind: ScanKind,
    pub location: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "scan_kind")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ScanKind {
    #[sea_orm(string_value = "check_in")]
    CheckIn,

    #[sea_orm(string_value = "check_out")]
    CheckOut,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_token::Entity",
        from = "Column::TokenId",
        to = "super::attendance_token::Column::Id"
    )]
    Token,
}

impl Related<super::attendance_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Token.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        token_id: i64,
        member_id: i64,
        kind: ScanKind,
        location: Option<String>,
        scanned_at: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        ActiveModel {
            token_id: Set(token_id),
            member_id: Set(member_id),
            kind: Set(kind),
            location: Set(location),
            scanned_at: Set(scanned_at),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn exists<C: ConnectionTrait>(
        db: &C,
        token_id: i64,
        member_id: i64,
        kind: ScanKind,
    ) -> Result<bool, DbErr> {
        let count = Entity::find()
            .filter(Column::TokenId.eq(token_id))
            .filter(Column::MemberId.eq(member_id))
            .filter(Column::Kind.eq(kind))
            .count(db)
            .await?;
        Ok(count > 0)
    }
}
