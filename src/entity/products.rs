use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub offer_price: Option<i64>,
    pub main_category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub condition: Option<String>,
    pub gender: Option<String>,
    pub style: Option<String>,
    pub material: Option<String>,
    /// JSON array of size labels.
    pub sizes: Json,
    pub stock: i32,
    /// JSON array of public image URLs.
    pub image_urls: Json,
    pub status: String,
    pub is_premium: bool,
    pub premium_until: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Owner,
    #[sea_orm(has_many = "super::premium_requests::Entity")]
    PremiumRequests,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::premium_requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PremiumRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
