use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// `title` and `description` case-folded at write time for search.
    pub title_folded: String,
    #[sea_orm(column_type = "Text")]
    pub description_folded: String,
    pub company_id: Uuid,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: String, // FULL_TIME | PART_TIME | CONTRACT | INTERNSHIP
    #[sea_orm(column_type = "Json")]
    pub requirements: Json, // ordered array of strings
    #[sea_orm(column_type = "Json")]
    pub benefits: Json,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
    #[sea_orm(has_many = "super::application::Entity")]
    Application,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Application.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
