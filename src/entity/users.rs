use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: Option<Date>,
    pub sex: Option<String>,
    pub residence: Option<String>,
    pub active: bool,
    pub role: String,
    pub is_premium: bool,
    pub subscription_start: Option<Date>,
    pub subscription_end: Option<Date>,
    pub is_seller_verified: bool,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub selfie_url: Option<String>,
    pub id_card_url: Option<String>,
    pub license_url: Option<String>,
    pub documents_last_updated_at: Option<DateTimeWithTimeZone>,
    pub product_count: i32,
    pub theme: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::Id",
        to = "super::accounts::Column::Id"
    )]
    Account,
    #[sea_orm(has_many = "super::products::Entity")]
    Products,
    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
