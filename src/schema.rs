table! {
    article_embeddings (id) {
        id -> Uuid,
        post -> Nullable<Uuid>,
        category -> Nullable<Text>,
        title -> Text,
        excerpt -> Text,
        content -> Text,
        embedding -> Array<Float4>,
        created_at -> Timestamp,
    }
}

table! {
    categories (id) {
        id -> Uuid,
        slug -> Text,
        name -> Text,
    }
}

table! {
    daily_quotas (day, category) {
        day -> Date,
        category -> Text,
        generated -> Int4,
        target -> Int4,
    }
}

table! {
    editors (username) {
        username -> Text,
        password -> Text,
    }
}

table! {
    post_categories (id) {
        id -> Uuid,
        post -> Uuid,
        category -> Uuid,
    }
}

table! {
    posts (id) {
        id -> Uuid,
        slug -> Text,
        title -> Text,
        content -> Text,
        excerpt -> Text,
        content_type -> Text,
        keywords -> Array<Text>,
        meta_description -> Text,
        status -> Text,
        is_ai_generated -> Bool,
        cover_image_url -> Nullable<Text>,
        quality_score -> Nullable<Int4>,
        quality_notes -> Array<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        published_at -> Nullable<Timestamp>,
        scheduled_for -> Nullable<Timestamp>,
        last_refreshed_at -> Nullable<Timestamp>,
    }
}

table! {
    tagged_posts (id) {
        id -> Uuid,
        tag -> Uuid,
        post -> Uuid,
    }
}

table! {
    tags (id) {
        id -> Uuid,
        slug -> Text,
        name -> Text,
    }
}

table! {
    tokens (id) {
        id -> Uuid,
        username -> Text,
        expires -> Timestamp,
    }
}

joinable!(article_embeddings -> posts (post));
joinable!(post_categories -> categories (category));
joinable!(post_categories -> posts (post));
joinable!(tagged_posts -> posts (post));
joinable!(tagged_posts -> tags (tag));
joinable!(tokens -> editors (username));

allow_tables_to_appear_in_same_query!(
    article_embeddings,
    categories,
    daily_quotas,
    editors,
    post_categories,
    posts,
    tagged_posts,
    tags,
    tokens,
);
